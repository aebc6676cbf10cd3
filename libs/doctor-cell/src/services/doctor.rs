// libs/doctor-cell/src/services/doctor.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{Doctor, DoctorError, DoctorSummary};
use crate::services::schedule::WeeklySchedule;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Directory of doctors patients can book: approved and active only.
    pub async fn list_doctors(&self, auth_token: Option<&str>) -> Result<Vec<DoctorSummary>, DoctorError> {
        debug!("Listing bookable doctors");

        let path = "/rest/v1/doctors?is_approved=eq.true&is_active=eq.true&order=full_name.asc";
        let rows: Vec<Doctor> = self
            .supabase
            .request(Method::GET, path, auth_token, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(rows.iter().map(DoctorSummary::from).collect())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: Option<&str>) -> Result<Doctor, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }

    /// Lookup guarded by the approval/active gate. Slot and booking
    /// endpoints go through this before any schedule work happens.
    pub async fn require_bookable(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor(doctor_id, auth_token).await?;

        if !doctor.is_bookable() {
            warn!("Doctor {} is not bookable (approved: {}, active: {})",
                doctor.id, doctor.is_approved, doctor.is_active);
            return Err(DoctorError::NotBookable);
        }

        Ok(doctor)
    }

    /// Repaired view of the doctor's own weekly schedule.
    pub async fn get_schedule(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<WeeklySchedule, DoctorError> {
        let doctor = self.get_doctor(doctor_id, Some(auth_token)).await?;
        Ok(doctor.weekly_schedule())
    }

    /// Replace the doctor's weekly schedule. Unlike the read path this is
    /// strict: a malformed document is the caller's mistake, not corrupted
    /// configuration, so it is rejected instead of repaired.
    pub async fn update_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &Value,
        auth_token: &str,
    ) -> Result<WeeklySchedule, DoctorError> {
        debug!("Updating schedule for doctor: {}", doctor_id);

        let parsed = WeeklySchedule::from_value(schedule)
            .map_err(|e| DoctorError::ValidationError(e.to_string()))?;

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let body = json!({
            "schedule": parsed.to_storage_json(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Doctor> = self
            .supabase
            .update(&path, Some(auth_token), body)
            .await
            .map_err(|e| match e {
                SupabaseError::NotFound(_) => DoctorError::NotFound,
                other => DoctorError::DatabaseError(other.to_string()),
            })?;

        if rows.is_empty() {
            return Err(DoctorError::NotFound);
        }

        debug!("Schedule updated for doctor: {}", doctor_id);
        Ok(parsed)
    }
}
