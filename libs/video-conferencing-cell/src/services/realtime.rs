// libs/video-conferencing-cell/src/services/realtime.rs
use reqwest::Client;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::models::{
    IceServer, RealtimeSessionRequest, RealtimeSessionResponse, SessionDescription,
    VideoConferencingError,
};

/// Cloudflare Realtime API client for managing WebRTC sessions.
/// Based on: https://developers.cloudflare.com/realtime/
pub struct CloudflareRealtimeClient {
    client: Client,
    app_id: String,
    api_token: String,
    base_url: String,
}

impl CloudflareRealtimeClient {
    pub fn new(config: &AppConfig) -> Result<Self, VideoConferencingError> {
        if !config.is_video_conferencing_configured() {
            return Err(VideoConferencingError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            app_id: config.cloudflare_realtime_app_id.clone(),
            api_token: config.cloudflare_realtime_api_token.clone(),
            base_url: config.cloudflare_realtime_base_url.clone(),
        })
    }

    /// Create a new WebRTC session with an initial offer SDP.
    /// POST /v1/apps/{appId}/sessions/new
    pub async fn create_session(
        &self,
        offer_sdp: String,
    ) -> Result<RealtimeSessionResponse, VideoConferencingError> {
        info!("Creating new Realtime session");

        let url = format!("{}/apps/{}/sessions/new", self.base_url, self.app_id);

        let request_body = RealtimeSessionRequest {
            session_description: SessionDescription {
                sdp_type: "offer".to_string(),
                sdp: offer_sdp,
            },
        };

        debug!("Sending session creation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Realtime session creation failed: {} - {}", status, response_text);
            return Err(VideoConferencingError::RealtimeApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let session_response: RealtimeSessionResponse = serde_json::from_str(&response_text)
            .map_err(|e| VideoConferencingError::RealtimeApiError {
                message: format!("Failed to parse session response: {}", e),
            })?;

        if let Some(error_code) = &session_response.error_code {
            let message = session_response
                .error_description
                .as_deref()
                .unwrap_or("Unknown error");
            error!("Realtime session error: {} - {}", error_code, message);
            return Err(VideoConferencingError::RealtimeApiError {
                message: format!("{}: {}", error_code, message),
            });
        }

        info!("Created Realtime session: {}", session_response.session_id);
        Ok(session_response)
    }

    /// Release a session. The Realtime API has no explicit deletion;
    /// sessions expire after inactivity, so this only logs the handoff.
    pub async fn cleanup_session(&self, session_id: &str) -> Result<(), VideoConferencingError> {
        info!("Releasing session {} (expires automatically)", session_id);
        Ok(())
    }

    /// ICE servers for the client-side peer connection.
    pub fn get_ice_servers(&self) -> Vec<IceServer> {
        vec![IceServer {
            urls: vec!["stun:stun.cloudflare.com:3478".to_string()],
            username: None,
            credential: None,
        }]
    }

    pub fn get_rtc_configuration(&self) -> serde_json::Value {
        serde_json::json!({
            "iceServers": self.get_ice_servers(),
            "bundlePolicy": "max-bundle"
        })
    }

    /// Reachability probe for the Realtime API.
    pub async fn health_check(&self) -> Result<bool, VideoConferencingError> {
        debug!("Performing Realtime API health check");

        let url = format!("{}/apps/{}", self.base_url, self.app_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await?;

        // 404 is expected for the bare app info endpoint.
        let is_healthy = response.status().is_success() || response.status() == 404;

        if !is_healthy {
            warn!("Realtime API health check failed: {}", response.status());
        }

        Ok(is_healthy)
    }
}
