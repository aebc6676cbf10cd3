// libs/appointment-cell/src/services/booking.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AvailableSlot, BookAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::resolve_available_slots;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
    lifecycle_service: AppointmentLifecycleService,
}

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    time: NaiveTime,
}

fn map_doctor_error(e: DoctorError) -> AppointmentError {
    match e {
        DoctorError::NotFound => AppointmentError::DoctorNotFound,
        DoctorError::NotBookable => AppointmentError::DoctorUnavailable,
        DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
    }
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            doctor_service: DoctorService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Bookable slots for a doctor on a date. The doctor must pass the
    /// approval/active gate before the resolver runs; an empty list is a
    /// valid answer (day off), not an error.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        debug!("Resolving available slots for doctor {} on {}", doctor_id, date);

        let doctor = self
            .doctor_service
            .require_bookable(doctor_id, auth_token)
            .await
            .map_err(map_doctor_error)?;

        let booked_times = self.booked_times(doctor_id, date, auth_token).await?;

        Ok(resolve_available_slots(
            &doctor.weekly_schedule(),
            date,
            &booked_times,
        ))
    }

    /// Times occupied by the doctor's active appointments on a date.
    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<HashSet<NaiveTime>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&status={}&select=time",
            doctor_id,
            date,
            AppointmentStatus::active_filter()
        );

        let rows: Vec<BookedTimeRow> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|row| row.time).collect())
    }

    /// Book a slot for a patient. Availability is re-checked at write time:
    /// the existence probe plus the store's active-slot uniqueness turns a
    /// lost race into a conflict answer instead of a silent double booking.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {} at {} {}",
            patient_id, request.doctor_id, request.appointment_date, request.appointment_time
        );

        self.doctor_service
            .require_bookable(request.doctor_id, Some(auth_token))
            .await
            .map_err(map_doctor_error)?;

        // Write-time availability re-check; a prior availability read is
        // only advisory.
        let existing_path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&time=eq.{}&status={}&limit=1",
            request.doctor_id,
            request.appointment_date,
            request.appointment_time.format("%H:%M:%S"),
            AppointmentStatus::active_filter()
        );

        let existing: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            warn!(
                "Slot {} {} already booked for doctor {}",
                request.appointment_date, request.appointment_time, request.doctor_id
            );
            return Err(AppointmentError::SlotNotAvailable);
        }

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": request.doctor_id,
            "date": request.appointment_date,
            "time": request.appointment_time.format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Pending,
            "reason": request.reason,
            "symptoms": request.symptoms,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Appointment> = self
            .supabase
            .insert("/rest/v1/appointments", Some(auth_token), body)
            .await
            .map_err(|e| match e {
                // The store's uniqueness constraint on the active slot set
                // caught a concurrent writer.
                SupabaseError::Conflict(_) => AppointmentError::SlotNotAvailable,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let appointment = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("insert returned no row".to_string()))?;

        info!("Appointment {} booked (status: {})", appointment.id, appointment.status);
        Ok(appointment)
    }

    /// All appointments of a doctor, optionally filtered by status, most
    /// recent first.
    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
        status_filter: Option<AppointmentStatus>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.desc,time.desc",
            doctor_id
        );
        if let Some(status) = status_filter {
            path.push_str(&format!("&status=eq.{}", status));
        }

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.desc,time.desc",
            patient_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// Fetch an appointment scoped to its doctor; foreign appointments are
    /// indistinguishable from absent ones.
    pub async fn get_doctor_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&doctor_id=eq.{}",
            appointment_id, doctor_id
        );

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Move an appointment through its lifecycle. The update is a single-row
    /// compare-and-set keyed on the observed status, so a concurrent
    /// transition surfaces as InvalidStatusTransition rather than a lost
    /// update.
    pub async fn transition_status(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .get_doctor_appointment(appointment_id, doctor_id, auth_token)
            .await?;

        self.lifecycle_service
            .validate_status_transition(&current.status, &new_status)?;

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&doctor_id=eq.{}&status=eq.{}",
            appointment_id, doctor_id, current.status
        );
        let body = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Appointment> = self
            .supabase
            .update(&path, Some(auth_token), body)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let updated = rows.into_iter().next().ok_or_else(|| {
            warn!(
                "Appointment {} changed state concurrently during {} -> {}",
                appointment_id, current.status, new_status
            );
            AppointmentError::InvalidStatusTransition(current.status)
        })?;

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment_id, current.status, updated.status
        );
        Ok(updated)
    }
}
