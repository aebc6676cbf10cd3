// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Slot lookup is public; everything that touches a concrete
    // appointment requires authentication.
    let public_routes = Router::new().route(
        "/doctors/{doctor_id}/available-slots",
        get(handlers::get_available_slots),
    );

    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/doctors/my-appointments", get(handlers::get_doctor_appointments))
        .route("/patients/my-appointments", get(handlers::get_patient_appointments))
        .route("/{appointment_id}/confirm", patch(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", patch(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", patch(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
