// libs/prescription-cell/src/services/prescription.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    CreatePrescriptionRequest, Prescription, PrescriptionError, UpdatePrescriptionRequest,
};

pub struct PrescriptionService {
    supabase: Arc<SupabaseClient>,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Write a prescription for one of the doctor's completed appointments.
    /// Each appointment carries at most one prescription.
    pub async fn create(
        &self,
        doctor_id: Uuid,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        info!(
            "Doctor {} writing prescription for appointment {}",
            doctor_id, request.appointment_id
        );

        let appointment = self
            .get_doctor_appointment(request.appointment_id, doctor_id, auth_token)
            .await?;

        if appointment["status"].as_str() != Some("Completed") {
            return Err(PrescriptionError::AppointmentNotCompleted);
        }

        let patient_id = appointment["patient_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                PrescriptionError::DatabaseError("appointment has no patient".to_string())
            })?;

        let existing_path = format!(
            "/rest/v1/prescriptions?appointment_id=eq.{}&limit=1&select=id",
            request.appointment_id
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(PrescriptionError::AlreadyExists);
        }

        let medicines = serde_json::to_string(&request.medicines)
            .map_err(|e| PrescriptionError::ValidationError(e.to_string()))?;
        let lab_tests = serde_json::to_string(&request.lab_tests)
            .map_err(|e| PrescriptionError::ValidationError(e.to_string()))?;

        let body = json!({
            "appointment_id": request.appointment_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "diagnosis": request.diagnosis,
            "notes": request.notes,
            "medicines": medicines,
            "lab_tests": lab_tests,
            "follow_up_date": request.follow_up_date,
            "is_finalized": request.is_finalized,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Prescription> = self
            .supabase
            .insert("/rest/v1/prescriptions", Some(auth_token), body)
            .await
            .map_err(|e| match e {
                // Unique index on appointment_id.
                SupabaseError::Conflict(_) => PrescriptionError::AlreadyExists,
                other => PrescriptionError::DatabaseError(other.to_string()),
            })?;

        let created = rows.into_iter().next().ok_or_else(|| {
            PrescriptionError::DatabaseError("insert returned no row".to_string())
        })?;

        info!("Prescription {} created (finalized: {})", created.id, created.is_finalized);
        Ok(created)
    }

    /// Amend a draft prescription. Finalization is one-way: once a
    /// prescription is finalized it can no longer be edited.
    pub async fn update(
        &self,
        prescription_id: Uuid,
        doctor_id: Uuid,
        request: UpdatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        debug!("Updating prescription {}", prescription_id);

        let current = self.get_for_doctor(prescription_id, doctor_id, auth_token).await?;

        if current.is_finalized {
            return Err(PrescriptionError::AlreadyFinalized);
        }

        let mut update = Map::new();
        if let Some(diagnosis) = request.diagnosis {
            update.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(notes) = request.notes {
            update.insert("notes".to_string(), json!(notes));
        }
        if let Some(medicines) = request.medicines {
            let encoded = serde_json::to_string(&medicines)
                .map_err(|e| PrescriptionError::ValidationError(e.to_string()))?;
            update.insert("medicines".to_string(), json!(encoded));
        }
        if let Some(lab_tests) = request.lab_tests {
            let encoded = serde_json::to_string(&lab_tests)
                .map_err(|e| PrescriptionError::ValidationError(e.to_string()))?;
            update.insert("lab_tests".to_string(), json!(encoded));
        }
        if let Some(follow_up_date) = request.follow_up_date {
            update.insert("follow_up_date".to_string(), json!(follow_up_date));
        }
        if let Some(is_finalized) = request.is_finalized {
            update.insert("is_finalized".to_string(), json!(is_finalized));
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&doctor_id=eq.{}",
            prescription_id, doctor_id
        );
        let rows: Vec<Prescription> = self
            .supabase
            .update(&path, Some(auth_token), Value::Object(update))
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PrescriptionError::NotFound)
    }

    pub async fn get_for_doctor(
        &self,
        prescription_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&doctor_id=eq.{}",
            prescription_id, doctor_id
        );
        self.fetch_one(&path, auth_token).await
    }

    pub async fn get_by_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?appointment_id=eq.{}&doctor_id=eq.{}",
            appointment_id, doctor_id
        );
        self.fetch_one(&path, auth_token).await
    }

    /// Patients only ever see finalized prescriptions.
    pub async fn patient_prescriptions(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Prescription>, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&is_finalized=eq.true&order=created_at.desc",
            patient_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))
    }

    pub async fn patient_prescription_detail(
        &self,
        prescription_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&patient_id=eq.{}&is_finalized=eq.true",
            prescription_id, patient_id
        );
        self.fetch_one(&path, auth_token).await
    }

    async fn fetch_one(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let rows: Vec<Prescription> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(PrescriptionError::NotFound)
    }

    async fn get_doctor_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Value, PrescriptionError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&doctor_id=eq.{}",
            appointment_id, doctor_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(PrescriptionError::AppointmentNotFound)
    }
}
