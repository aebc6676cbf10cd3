// libs/prescription-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn prescription_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Doctor side
        .route("/", post(handlers::create_prescription))
        .route("/{prescription_id}", get(handlers::get_prescription))
        .route("/{prescription_id}", patch(handlers::update_prescription))
        .route(
            "/by-appointment/{appointment_id}",
            get(handlers::get_prescription_by_appointment),
        )
        // Patient side
        .route("/patient/my-prescriptions", get(handlers::get_my_prescriptions))
        .route(
            "/patient/{prescription_id}",
            get(handlers::get_my_prescription_detail),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
