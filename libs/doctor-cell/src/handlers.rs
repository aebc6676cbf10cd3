// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, UpdateScheduleRequest};
use crate::services::DoctorService;

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::NotBookable => {
            AppError::BadRequest("Doctor is not available for appointments".to_string())
        }
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.has_role("doctor") {
        return Err(AppError::Auth("Doctor role required".to_string()));
    }
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid doctor ID".to_string()))
}

#[axum::debug_handler]
pub async fn list_doctors(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctors = service.list_doctors(None).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service
        .get_doctor(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "id": doctor.id,
        "full_name": doctor.full_name,
        "specialty": doctor.specialty,
        "is_approved": doctor.is_approved,
        "is_active": doctor.is_active
    })))
}

/// Current doctor's weekly schedule, repaired view.
#[axum::debug_handler]
pub async fn get_my_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;
    let service = DoctorService::new(&state);

    let schedule = service
        .get_schedule(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "schedule": schedule.to_value() })))
}

#[axum::debug_handler]
pub async fn update_my_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;
    let service = DoctorService::new(&state);

    let schedule = service
        .update_schedule(doctor_id, &request.schedule, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule.to_value(),
        "message": "Schedule updated successfully"
    })))
}
