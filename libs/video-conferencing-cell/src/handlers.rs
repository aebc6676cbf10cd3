// libs/video-conferencing-cell/src/handlers.rs
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

use crate::models::{JoinRoomRequest, VideoConferencingError};
use crate::services::rooms::RoomLifecycleService;

fn map_video_error(e: VideoConferencingError) -> AppError {
    match e {
        VideoConferencingError::NotConfigured => {
            AppError::Internal("Video conferencing is not configured".to_string())
        }
        VideoConferencingError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        VideoConferencingError::Unauthorized => {
            AppError::Auth("Not authorized to join this appointment".to_string())
        }
        VideoConferencingError::RealtimeApiError { message } => AppError::ExternalService(message),
        VideoConferencingError::ValidationError { message } => AppError::ValidationError(message),
        VideoConferencingError::DatabaseError(msg) => AppError::Internal(msg),
        VideoConferencingError::Transport(e) => AppError::ExternalService(e.to_string()),
    }
}

/// Join the caller into their appointment's consultation room.
#[axum::debug_handler]
pub async fn join_appointment_call(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<Value>, AppError> {
    let service = RoomLifecycleService::new(&state).map_err(map_video_error)?;

    let joined = service
        .join_appointment_room(appointment_id, &user, request.offer_sdp, auth.token())
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!(joined)))
}

#[axum::debug_handler]
pub async fn video_health_check(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = match RoomLifecycleService::new(&state) {
        Ok(service) => service,
        Err(VideoConferencingError::NotConfigured) => {
            return Ok(Json(json!({
                "status": "unconfigured",
                "healthy": false
            })))
        }
        Err(e) => return Err(map_video_error(e)),
    };

    let healthy = service.health_check().await.map_err(map_video_error)?;

    Ok(Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "healthy": healthy
    })))
}
