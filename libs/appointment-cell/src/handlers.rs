// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use video_conferencing_cell::services::rooms::RoomLifecycleService;

use crate::models::{
    AppointmentError, AppointmentStatus, BookAppointmentRequest, SlotQuery, StatusFilterQuery,
};
use crate::services::booking::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::DoctorUnavailable => {
            AppError::BadRequest("Doctor is not available for appointments".to_string())
        }
        AppointmentError::SlotNotAvailable => {
            AppError::BadRequest("This time slot is already booked".to_string())
        }
        AppointmentError::InvalidStatusTransition(status) => {
            AppError::InvalidState(format!("Cannot modify appointment in status: {}", status))
        }
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn require_role(user: &User, role: &str) -> Result<Uuid, AppError> {
    if !user.has_role(role) {
        return Err(AppError::Auth(format!("{} role required", role)));
    }
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

// ==============================================================================
// SLOT AND BOOKING HANDLERS
// ==============================================================================

/// Available time slots for a doctor on a date. Public; an empty list means
/// the doctor is off that day.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let slots = service
        .get_available_slots(doctor_id, query.selected_date, None)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service
        .book_appointment(patient_id, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

// ==============================================================================
// LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<StatusFilterQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = AppointmentBookingService::new(&state);

    let appointments = service
        .doctor_appointments(doctor_id, query.status_filter, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = AppointmentBookingService::new(&state);

    let appointments = service
        .patient_appointments(patient_id, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    transition(state, appointment_id, user, auth.token(), AppointmentStatus::Confirmed).await
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    transition(state, appointment_id, user, auth.token(), AppointmentStatus::Cancelled).await
}

/// Completing a consultation also tears down its video room. The teardown
/// is fire-and-forget: the appointment is already completed, a cleanup
/// failure must never undo that.
#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let response = transition(
        state.clone(),
        appointment_id,
        user,
        auth.token(),
        AppointmentStatus::Completed,
    )
    .await?;

    let config = state.clone();
    tokio::spawn(async move {
        match RoomLifecycleService::new(&config) {
            Ok(rooms) => {
                if let Err(e) = rooms.teardown_room(appointment_id).await {
                    warn!("Video room teardown failed for appointment {}: {}", appointment_id, e);
                }
            }
            Err(e) => {
                warn!("Video room teardown skipped for appointment {}: {}", appointment_id, e);
            }
        }
    });

    Ok(response)
}

async fn transition(
    state: Arc<AppConfig>,
    appointment_id: Uuid,
    user: User,
    token: &str,
    new_status: AppointmentStatus,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_role(&user, "doctor")?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service
        .transition_status(appointment_id, doctor_id, new_status, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}
