use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use prescription_cell::router::prescription_routes;
use quotation_cell::router::quotation_routes;
use shared_config::AppConfig;
use video_conferencing_cell::router::video_conferencing_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareLink API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/prescriptions", prescription_routes(state.clone()))
        .nest("/quotations", quotation_routes(state.clone()))
        .nest("/video", video_conferencing_routes(state))
}
