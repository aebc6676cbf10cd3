// libs/video-conferencing-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// REALTIME API WIRE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeSessionRequest {
    #[serde(rename = "sessionDescription")]
    pub session_description: SessionDescription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "sessionDescription")]
    pub session_description: Option<SessionDescription>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "errorDescription")]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

// ==============================================================================
// ROOM MODELS
// ==============================================================================

/// A participant's WebRTC session within an appointment's consultation room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSession {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub room_name: String,
    pub cloudflare_session_id: String,
    pub participant_role: ParticipantRole,
    pub status: RoomSessionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomSessionStatus {
    Active,
    Ended,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomRequest {
    pub offer_sdp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRoomResponse {
    pub room_name: String,
    pub session_id: String,
    pub session_description: Option<SessionDescription>,
    pub rtc_configuration: serde_json::Value,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VideoConferencingError {
    #[error("Video conferencing is not configured")]
    NotConfigured,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Not authorized to join this appointment")]
    Unauthorized,

    #[error("Realtime API error: {message}")]
    RealtimeApiError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
}
