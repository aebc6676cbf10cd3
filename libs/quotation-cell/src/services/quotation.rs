// libs/quotation-cell/src/services/quotation.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    CreateQuotationRequest, QuotationError, QuotationFull, QuotationRequest, QuotationResponse,
    QuotationStatus, SubmitQuotationResponseRequest,
};
use crate::services::state::validate_transition;

/// Minimal view of a prescription row, enough to validate ownership and
/// snapshot the medicine list.
#[derive(Debug, Deserialize)]
struct PrescriptionRef {
    #[allow(dead_code)]
    id: Uuid,
    medicines: Option<String>,
}

pub struct QuotationService {
    supabase: Arc<SupabaseClient>,
}

impl QuotationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    // ==========================================================================
    // PATIENT OPERATIONS
    // ==========================================================================

    /// Open a quotation request against a pharmacy. The prescription must be
    /// finalized and owned by the patient, the pharmacy approved and active,
    /// and no other active request may exist for the same pair.
    pub async fn create_request(
        &self,
        patient_id: Uuid,
        request: CreateQuotationRequest,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        info!(
            "Creating quotation request: patient {} -> pharmacy {} for prescription {}",
            patient_id, request.pharmacy_id, request.prescription_id
        );

        let prescription = self
            .get_finalized_prescription(request.prescription_id, patient_id, auth_token)
            .await?;

        self.require_active_pharmacy(request.pharmacy_id, auth_token)
            .await?;

        // At most one active (pending/quoted) request per
        // (prescription, patient, pharmacy).
        let dup_path = format!(
            "/rest/v1/quotation_requests?prescription_id=eq.{}&patient_id=eq.{}&pharmacy_id=eq.{}&status=in.(pending,quoted)&limit=1",
            request.prescription_id, patient_id, request.pharmacy_id
        );
        let duplicates: Vec<QuotationRequest> = self
            .supabase
            .request(Method::GET, &dup_path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        if !duplicates.is_empty() {
            return Err(QuotationError::DuplicateActiveRequest);
        }

        let body = json!({
            "prescription_id": request.prescription_id,
            "patient_id": patient_id,
            "pharmacy_id": request.pharmacy_id,
            "medicines_snapshot": prescription.medicines.unwrap_or_else(|| "[]".to_string()),
            "note": request.note,
            "status": QuotationStatus::Pending,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<QuotationRequest> = self
            .supabase
            .insert("/rest/v1/quotation_requests", Some(auth_token), body)
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict(_) => QuotationError::DuplicateActiveRequest,
                other => QuotationError::DatabaseError(other.to_string()),
            })?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| QuotationError::DatabaseError("insert returned no row".to_string()))?;

        info!("Quotation request {} created (status: {})", created.id, created.status);
        Ok(created)
    }

    pub async fn patient_requests(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<QuotationFull>, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let requests: Vec<QuotationRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        self.join_responses(requests, auth_token).await
    }

    pub async fn patient_requests_for_prescription(
        &self,
        patient_id: Uuid,
        prescription_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<QuotationFull>, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?patient_id=eq.{}&prescription_id=eq.{}&order=created_at.desc",
            patient_id, prescription_id
        );
        let requests: Vec<QuotationRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        self.join_responses(requests, auth_token).await
    }

    /// Accept a quote. Only a quoted request can be accepted; sibling
    /// requests for the same prescription are left alone.
    pub async fn accept(
        &self,
        request_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        let current = self.get_patient_request(request_id, patient_id, auth_token).await?;
        validate_transition(current.status, QuotationStatus::Accepted)?;

        self.compare_and_set(
            request_id,
            &format!("patient_id=eq.{}", patient_id),
            QuotationStatus::Quoted,
            QuotationStatus::Accepted,
            auth_token,
        )
        .await
    }

    /// Reject a request, quoted or still pending.
    pub async fn reject(
        &self,
        request_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        let current = self.get_patient_request(request_id, patient_id, auth_token).await?;
        validate_transition(current.status, QuotationStatus::Rejected)?;

        self.compare_and_set(
            request_id,
            &format!("patient_id=eq.{}", patient_id),
            current.status,
            QuotationStatus::Rejected,
            auth_token,
        )
        .await
    }

    // ==========================================================================
    // PHARMACY OPERATIONS
    // ==========================================================================

    pub async fn pharmacy_requests(
        &self,
        pharmacy_id: Uuid,
        status_filter: Option<QuotationStatus>,
        auth_token: &str,
    ) -> Result<Vec<QuotationRequest>, QuotationError> {
        let mut path = format!(
            "/rest/v1/quotation_requests?pharmacy_id=eq.{}&order=created_at.desc",
            pharmacy_id
        );
        if let Some(status) = status_filter {
            path.push_str(&format!("&status=eq.{}", status));
        }

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))
    }

    pub async fn pharmacy_request_detail(
        &self,
        request_id: Uuid,
        pharmacy_id: Uuid,
        auth_token: &str,
    ) -> Result<QuotationFull, QuotationError> {
        let request = self
            .get_pharmacy_request(request_id, pharmacy_id, auth_token)
            .await?;
        let response = self.get_response(request_id, auth_token).await?;

        Ok(QuotationFull { request, response })
    }

    /// Submit the itemized quote for a pending request. Creates the 1:1
    /// response record, then moves the request to quoted with a
    /// compare-and-set keyed on pending.
    pub async fn submit_response(
        &self,
        pharmacy_id: Uuid,
        request: SubmitQuotationResponseRequest,
        auth_token: &str,
    ) -> Result<QuotationResponse, QuotationError> {
        info!(
            "Pharmacy {} responding to quotation request {}",
            pharmacy_id, request.request_id
        );

        let current = self
            .get_pharmacy_request(request.request_id, pharmacy_id, auth_token)
            .await?;

        validate_transition(current.status, QuotationStatus::Quoted)?;

        if self.get_response(request.request_id, auth_token).await?.is_some() {
            return Err(QuotationError::DuplicateResponse);
        }

        let items = serde_json::to_string(&request.items)
            .map_err(|e| QuotationError::ValidationError(e.to_string()))?;

        let body = json!({
            "request_id": request.request_id,
            "pharmacy_id": pharmacy_id,
            "items": items,
            "total_amount": request.total_amount,
            "delivery_available": request.delivery_available,
            "delivery_fee": request.delivery_fee,
            "notes": request.notes,
            "valid_until": request.valid_until,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<QuotationResponse> = self
            .supabase
            .insert("/rest/v1/quotation_responses", Some(auth_token), body)
            .await
            .map_err(|e| match e {
                // Unique index on request_id: a concurrent double-submit
                // lost the race.
                SupabaseError::Conflict(_) => QuotationError::DuplicateResponse,
                other => QuotationError::DatabaseError(other.to_string()),
            })?;

        let response = rows
            .into_iter()
            .next()
            .ok_or_else(|| QuotationError::DatabaseError("insert returned no row".to_string()))?;

        // The only state-changing side effect of a response: this request
        // moves to quoted. A lost CAS means the patient rejected while we
        // were writing; the response record stands, the rejection wins.
        if let Err(e) = self
            .compare_and_set(
                request.request_id,
                &format!("pharmacy_id=eq.{}", pharmacy_id),
                QuotationStatus::Pending,
                QuotationStatus::Quoted,
                auth_token,
            )
            .await
        {
            warn!(
                "Request {} changed state during response submission: {}",
                request.request_id, e
            );
        }

        info!("Quotation response {} recorded", response.id);
        Ok(response)
    }

    // ==========================================================================
    // INTERNALS
    // ==========================================================================

    async fn get_finalized_prescription(
        &self,
        prescription_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<PrescriptionRef, QuotationError> {
        let path = format!(
            "/rest/v1/prescriptions?id=eq.{}&patient_id=eq.{}&is_finalized=eq.true",
            prescription_id, patient_id
        );
        let rows: Vec<PrescriptionRef> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(QuotationError::PrescriptionNotFound)
    }

    async fn require_active_pharmacy(
        &self,
        pharmacy_id: Uuid,
        auth_token: &str,
    ) -> Result<(), QuotationError> {
        let path = format!(
            "/rest/v1/pharmacies?id=eq.{}&is_approved=eq.true&is_active=eq.true&select=id",
            pharmacy_id
        );
        let rows: Vec<serde_json::Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        if rows.is_empty() {
            return Err(QuotationError::PharmacyNotFound);
        }
        Ok(())
    }

    async fn get_patient_request(
        &self,
        request_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?id=eq.{}&patient_id=eq.{}",
            request_id, patient_id
        );
        let rows: Vec<QuotationRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(QuotationError::RequestNotFound)
    }

    async fn get_pharmacy_request(
        &self,
        request_id: Uuid,
        pharmacy_id: Uuid,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?id=eq.{}&pharmacy_id=eq.{}",
            request_id, pharmacy_id
        );
        let rows: Vec<QuotationRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(QuotationError::RequestNotFound)
    }

    async fn get_response(
        &self,
        request_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<QuotationResponse>, QuotationError> {
        let path = format!("/rest/v1/quotation_responses?request_id=eq.{}", request_id);
        let rows: Vec<QuotationResponse> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Single-row compare-and-set: PATCH filtered on the expected status.
    /// An empty result means the row was no longer in `expected`, so the
    /// transition is reported against the state we had observed.
    async fn compare_and_set(
        &self,
        request_id: Uuid,
        owner_filter: &str,
        expected: QuotationStatus,
        next: QuotationStatus,
        auth_token: &str,
    ) -> Result<QuotationRequest, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?id=eq.{}&{}&status=eq.{}",
            request_id, owner_filter, expected
        );
        let body = json!({
            "status": next,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<QuotationRequest> = self
            .supabase
            .update(&path, Some(auth_token), body)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        let updated = rows.into_iter().next().ok_or_else(|| {
            debug!(
                "CAS lost on request {}: expected {}, moving to {}",
                request_id, expected, next
            );
            QuotationError::InvalidState(expected)
        })?;

        info!("Quotation request {} transitioned {} -> {}", request_id, expected, updated.status);
        Ok(updated)
    }

    async fn join_responses(
        &self,
        requests: Vec<QuotationRequest>,
        auth_token: &str,
    ) -> Result<Vec<QuotationFull>, QuotationError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = requests.iter().map(|r| r.id.to_string()).collect();
        let path = format!(
            "/rest/v1/quotation_responses?request_id=in.({})",
            ids.join(",")
        );
        let responses: Vec<QuotationResponse> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        Ok(requests
            .into_iter()
            .map(|request| {
                let response = responses.iter().find(|r| r.request_id == request.id).cloned();
                QuotationFull { request, response }
            })
            .collect())
    }
}
