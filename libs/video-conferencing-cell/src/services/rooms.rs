// libs/video-conferencing-cell/src/services/rooms.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    JoinRoomResponse, ParticipantRole, RoomSessionStatus, VideoConferencingError,
};
use crate::services::realtime::CloudflareRealtimeClient;

/// Consultation room management: one room per appointment, named
/// `appointment_{id}_consultation`, participants joined through Realtime
/// sessions.
pub struct RoomLifecycleService {
    supabase: Arc<SupabaseClient>,
    realtime: CloudflareRealtimeClient,
}

impl RoomLifecycleService {
    pub fn new(config: &AppConfig) -> Result<Self, VideoConferencingError> {
        Ok(Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            realtime: CloudflareRealtimeClient::new(config)?,
        })
    }

    pub fn room_name(appointment_id: Uuid) -> String {
        format!("appointment_{}_consultation", appointment_id)
    }

    /// Join the caller into their appointment's consultation room. The
    /// caller must be the patient or the doctor of that appointment.
    pub async fn join_appointment_room(
        &self,
        appointment_id: Uuid,
        user: &User,
        offer_sdp: String,
        auth_token: &str,
    ) -> Result<JoinRoomResponse, VideoConferencingError> {
        info!("User {} joining room for appointment {}", user.id, appointment_id);

        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        let role = self.verify_participant(&appointment, user)?;

        let session = self.realtime.create_session(offer_sdp).await?;
        let room_name = Self::room_name(appointment_id);

        let record = json!({
            "appointment_id": appointment_id,
            "room_name": room_name.clone(),
            "cloudflare_session_id": session.session_id.clone(),
            "participant_role": role,
            "status": RoomSessionStatus::Active,
            "created_at": Utc::now().to_rfc3339(),
        });

        let _: Vec<Value> = self
            .supabase
            .insert("/rest/v1/room_sessions", Some(auth_token), record)
            .await
            .map_err(|e| VideoConferencingError::DatabaseError(e.to_string()))?;

        Ok(JoinRoomResponse {
            room_name,
            session_id: session.session_id,
            session_description: session.session_description,
            rtc_configuration: self.realtime.get_rtc_configuration(),
        })
    }

    /// Best-effort teardown of an appointment's room, run after the
    /// consultation completes. Marks the room's sessions ended and releases
    /// them; every failure is logged and swallowed by the caller.
    pub async fn teardown_room(
        &self,
        appointment_id: Uuid,
    ) -> Result<(), VideoConferencingError> {
        let room_name = Self::room_name(appointment_id);
        info!("Tearing down room {}", room_name);

        let path = format!(
            "/rest/v1/room_sessions?appointment_id=eq.{}&status=eq.active",
            appointment_id
        );
        let sessions: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| VideoConferencingError::DatabaseError(e.to_string()))?;

        for session in &sessions {
            if let Some(session_id) = session["cloudflare_session_id"].as_str() {
                if let Err(e) = self.realtime.cleanup_session(session_id).await {
                    warn!("Failed to release session {}: {}", session_id, e);
                }
            }
        }

        if !sessions.is_empty() {
            let update_path = format!(
                "/rest/v1/room_sessions?appointment_id=eq.{}&status=eq.active",
                appointment_id
            );
            let _: Vec<Value> = self
                .supabase
                .update(
                    &update_path,
                    None,
                    json!({ "status": RoomSessionStatus::Ended }),
                )
                .await
                .map_err(|e| VideoConferencingError::DatabaseError(e.to_string()))?;
        }

        debug!("Room {} torn down ({} sessions)", room_name, sessions.len());
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool, VideoConferencingError> {
        self.realtime.health_check().await
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Value, VideoConferencingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| VideoConferencingError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(VideoConferencingError::AppointmentNotFound)
    }

    fn verify_participant(
        &self,
        appointment: &Value,
        user: &User,
    ) -> Result<ParticipantRole, VideoConferencingError> {
        let patient_id = appointment["patient_id"].as_str().unwrap_or_default();
        let doctor_id = appointment["doctor_id"].as_str().unwrap_or_default();

        match user.role.as_deref() {
            Some("patient") if user.id == patient_id => Ok(ParticipantRole::Patient),
            Some("doctor") if user.id == doctor_id => Ok(ParticipantRole::Doctor),
            _ => {
                warn!(
                    "User {} is not a participant of this appointment",
                    user.id
                );
                Err(VideoConferencingError::Unauthorized)
            }
        }
    }
}
