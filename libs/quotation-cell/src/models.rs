// libs/quotation-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// QUOTATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Pending,
    Quoted,
    Accepted,
    Rejected,
    /// Reserved terminal state for quote validity lapses; no transition
    /// currently sets it.
    Expired,
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotationStatus::Pending => write!(f, "pending"),
            QuotationStatus::Quoted => write!(f, "quoted"),
            QuotationStatus::Accepted => write!(f, "accepted"),
            QuotationStatus::Rejected => write!(f, "rejected"),
            QuotationStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A patient's request for pharmacy pricing on a finalized prescription.
/// The medicine list is snapshotted at creation so the quote basis never
/// shifts under the pharmacy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub patient_id: Uuid,
    pub pharmacy_id: Uuid,
    pub medicines_snapshot: String,
    pub note: Option<String>,
    pub status: QuotationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A pharmacy's itemized price reply. Exactly one per request; immutable
/// once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: String,
    pub total_amount: f64,
    pub delivery_available: bool,
    pub delivery_fee: f64,
    pub notes: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QuotationResponse {
    /// Itemized pricing decoded from the stored JSON text.
    pub fn parsed_items(&self) -> Vec<QuoteItem> {
        serde_json::from_str(&self.items).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItem {
    pub medicine_name: String,
    pub available: bool,
    pub unit_price: f64,
    pub quantity: i32,
    pub subtotal: f64,
    pub note: Option<String>,
}

/// A request paired with its response, when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationFull {
    pub request: QuotationRequest,
    pub response: Option<QuotationResponse>,
}

// ==============================================================================
// PHARMACY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pharmacy {
    pub id: Uuid,
    pub pharmacy_name: String,
    pub owner_name: String,
    pub city: String,
    pub state: String,
    pub is_approved: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacyListItem {
    pub id: Uuid,
    pub pharmacy_name: String,
    pub city: String,
    pub state: String,
}

impl From<&Pharmacy> for PharmacyListItem {
    fn from(pharmacy: &Pharmacy) -> Self {
        Self {
            id: pharmacy.id,
            pharmacy_name: pharmacy.pharmacy_name.clone(),
            city: pharmacy.city.clone(),
            state: pharmacy.state.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PharmacyStats {
    pub total_requests: usize,
    pub pending_requests: usize,
    pub quoted_requests: usize,
    pub accepted_requests: usize,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotationRequest {
    pub prescription_id: Uuid,
    pub pharmacy_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQuotationResponseRequest {
    pub request_id: Uuid,
    pub items: Vec<QuoteItem>,
    pub total_amount: f64,
    pub delivery_available: bool,
    pub delivery_fee: f64,
    pub notes: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilterQuery {
    pub status_filter: Option<QuotationStatus>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum QuotationError {
    #[error("Prescription not found or not finalized")]
    PrescriptionNotFound,

    #[error("Pharmacy not found or not available")]
    PharmacyNotFound,

    #[error("Quotation request not found")]
    RequestNotFound,

    #[error("An active quotation request already exists for this pharmacy")]
    DuplicateActiveRequest,

    #[error("A response has already been submitted for this request")]
    DuplicateResponse,

    #[error("Operation not permitted for a request with status '{0}'")]
    InvalidState(QuotationStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
