// libs/doctor-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::schedule::WeeklySchedule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub license_number: String,
    /// Weekly schedule persisted as JSON text; see `WeeklySchedule`.
    pub schedule: Option<String>,
    pub is_approved: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    /// Repaired view of the stored schedule.
    pub fn weekly_schedule(&self) -> WeeklySchedule {
        WeeklySchedule::parse_or_default(self.schedule.as_deref())
    }

    pub fn is_bookable(&self) -> bool {
        self.is_approved && self.is_active
    }
}

/// Directory listing entry; the public view of a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
}

impl From<&Doctor> for DoctorSummary {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            full_name: doctor.full_name.clone(),
            specialty: doctor.specialty.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateScheduleRequest {
    pub schedule: serde_json::Value,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor is not available for appointments")]
    NotBookable,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
