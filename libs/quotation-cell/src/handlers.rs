// libs/quotation-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateQuotationRequest, QuotationError, StatusFilterQuery, SubmitQuotationResponseRequest,
};
use crate::services::{PharmacyDirectoryService, QuotationService};

fn map_quotation_error(e: QuotationError) -> AppError {
    match e {
        QuotationError::PrescriptionNotFound => {
            AppError::NotFound("Prescription not found or not finalized".to_string())
        }
        QuotationError::PharmacyNotFound => {
            AppError::NotFound("Pharmacy not found or not available".to_string())
        }
        QuotationError::RequestNotFound => {
            AppError::NotFound("Quotation request not found".to_string())
        }
        QuotationError::DuplicateActiveRequest => AppError::Conflict(
            "You already have an active quotation request for this pharmacy".to_string(),
        ),
        QuotationError::DuplicateResponse => {
            AppError::Conflict("You have already responded to this request".to_string())
        }
        QuotationError::InvalidState(status) => {
            AppError::InvalidState(format!("Cannot perform this action on a '{}' request", status))
        }
        QuotationError::ValidationError(msg) => AppError::ValidationError(msg),
        QuotationError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

fn require_role(user: &User, role: &str) -> Result<Uuid, AppError> {
    if !user.has_role(role) {
        return Err(AppError::Auth(format!("{} role required", role)));
    }
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_pharmacies(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, "patient")?;
    let service = PharmacyDirectoryService::new(&state);

    let pharmacies = service
        .list_pharmacies(auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(pharmacies)))
}

#[axum::debug_handler]
pub async fn create_quotation_request(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = QuotationService::new(&state);

    let created = service
        .create_request(patient_id, request, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok((StatusCode::CREATED, Json(json!(created))))
}

#[axum::debug_handler]
pub async fn get_my_quotation_requests(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = QuotationService::new(&state);

    let quotations = service
        .patient_requests(patient_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(quotations)))
}

#[axum::debug_handler]
pub async fn get_quotations_for_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = QuotationService::new(&state);

    let quotations = service
        .patient_requests_for_prescription(patient_id, prescription_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(quotations)))
}

#[axum::debug_handler]
pub async fn accept_quotation(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = QuotationService::new(&state);

    let updated = service
        .accept(request_id, patient_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn reject_quotation(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_role(&user, "patient")?;
    let service = QuotationService::new(&state);

    let updated = service
        .reject(request_id, patient_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(updated)))
}

// ==============================================================================
// PHARMACY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_pharmacy_requests(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<StatusFilterQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let pharmacy_id = require_role(&user, "pharmacy")?;
    let service = QuotationService::new(&state);

    let requests = service
        .pharmacy_requests(pharmacy_id, query.status_filter, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn get_pharmacy_request_detail(
    State(state): State<Arc<AppConfig>>,
    Path(request_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let pharmacy_id = require_role(&user, "pharmacy")?;
    let service = QuotationService::new(&state);

    let detail = service
        .pharmacy_request_detail(request_id, pharmacy_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn submit_quotation_response(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitQuotationResponseRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let pharmacy_id = require_role(&user, "pharmacy")?;
    let service = QuotationService::new(&state);

    let response = service
        .submit_response(pharmacy_id, request, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok((StatusCode::CREATED, Json(json!(response))))
}

#[axum::debug_handler]
pub async fn get_pharmacy_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let pharmacy_id = require_role(&user, "pharmacy")?;
    let service = PharmacyDirectoryService::new(&state);

    let stats = service
        .stats(pharmacy_id, auth.token())
        .await
        .map_err(map_quotation_error)?;

    Ok(Json(json!(stats)))
}
