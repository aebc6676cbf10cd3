// libs/quotation-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn quotation_routes(state: Arc<AppConfig>) -> Router {
    // Every quotation operation runs on behalf of a patient or a pharmacy.
    let protected_routes = Router::new()
        // Patient side
        .route("/pharmacies", get(handlers::list_pharmacies))
        .route("/request", post(handlers::create_quotation_request))
        .route("/patient/my-requests", get(handlers::get_my_quotation_requests))
        .route(
            "/patient/prescription/{prescription_id}",
            get(handlers::get_quotations_for_prescription),
        )
        .route("/patient/{request_id}/accept", patch(handlers::accept_quotation))
        .route("/patient/{request_id}/reject", patch(handlers::reject_quotation))
        // Pharmacy side
        .route("/pharmacy/requests", get(handlers::get_pharmacy_requests))
        .route(
            "/pharmacy/request/{request_id}",
            get(handlers::get_pharmacy_request_detail),
        )
        .route("/pharmacy/respond", post(handlers::submit_quotation_response))
        .route("/pharmacy/stats", get(handlers::get_pharmacy_stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
