// libs/prescription-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// PRESCRIPTION MODELS
// ==============================================================================

/// A prescription written for a completed consultation. Medicine and lab
/// test lists persist as JSON text columns and are decoded at the model
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub medicines: Option<String>,
    pub lab_tests: Option<String>,
    pub follow_up_date: Option<String>,
    pub is_finalized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prescription {
    pub fn parsed_medicines(&self) -> Vec<MedicineItem> {
        self.medicines
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn parsed_lab_tests(&self) -> Vec<LabTestItem> {
        self.lab_tests
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineItem {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTestItem {
    pub name: String,
    pub instructions: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub appointment_id: Uuid,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub medicines: Vec<MedicineItem>,
    #[serde(default)]
    pub lab_tests: Vec<LabTestItem>,
    pub follow_up_date: Option<String>,
    #[serde(default)]
    pub is_finalized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub medicines: Option<Vec<MedicineItem>>,
    pub lab_tests: Option<Vec<LabTestItem>>,
    pub follow_up_date: Option<String>,
    pub is_finalized: Option<bool>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PrescriptionError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Prescriptions can only be written for completed appointments")]
    AppointmentNotCompleted,

    #[error("Prescription not found")]
    NotFound,

    #[error("A prescription already exists for this appointment")]
    AlreadyExists,

    #[error("Finalized prescriptions cannot be edited")]
    AlreadyFinalized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
