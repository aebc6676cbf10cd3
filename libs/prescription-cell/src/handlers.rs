// libs/prescription-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePrescriptionRequest, PrescriptionError, UpdatePrescriptionRequest};
use crate::services::PrescriptionService;

fn map_prescription_error(e: PrescriptionError) -> AppError {
    match e {
        PrescriptionError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        PrescriptionError::AppointmentNotCompleted => AppError::InvalidState(
            "Prescriptions can only be written for completed appointments".to_string(),
        ),
        PrescriptionError::NotFound => AppError::NotFound("Prescription not found".to_string()),
        PrescriptionError::AlreadyExists => {
            AppError::Conflict("A prescription already exists for this appointment".to_string())
        }
        PrescriptionError::AlreadyFinalized => {
            AppError::InvalidState("Finalized prescriptions cannot be edited".to_string())
        }
        PrescriptionError::ValidationError(msg) => AppError::ValidationError(msg),
        PrescriptionError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn require_role(user: &User, role: &str) -> Result<Uuid, AppError> {
    if !user.has_role(role) {
        return Err(AppError::Auth(format!("{} role required", role)));
    }
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .create(doctor_id, request, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok((StatusCode::CREATED, Json(json!(prescription))))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .update(prescription_id, doctor_id, request, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .get_for_doctor(prescription_id, doctor_id, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn get_prescription_by_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .get_by_appointment(appointment_id, doctor_id, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!(prescription)))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_prescriptions(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = PrescriptionService::new(&state);

    let prescriptions = service
        .patient_prescriptions(patient_id, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!({
        "prescriptions": prescriptions,
        "total": prescriptions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_my_prescription_detail(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .patient_prescription_detail(prescription_id, patient_id, auth.token())
        .await
        .map_err(map_prescription_error)?;

    Ok(Json(json!(prescription)))
}
