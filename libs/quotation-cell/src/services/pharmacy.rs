// libs/quotation-cell/src/services/pharmacy.rs
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Pharmacy, PharmacyListItem, PharmacyStats, QuotationError, QuotationStatus};

pub struct PharmacyDirectoryService {
    supabase: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct StatusRow {
    status: QuotationStatus,
}

impl PharmacyDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Pharmacies a patient can send quotation requests to: approved and
    /// active only, alphabetical.
    pub async fn list_pharmacies(
        &self,
        auth_token: &str,
    ) -> Result<Vec<PharmacyListItem>, QuotationError> {
        debug!("Listing approved pharmacies");

        let path =
            "/rest/v1/pharmacies?is_approved=eq.true&is_active=eq.true&order=pharmacy_name.asc";
        let rows: Vec<Pharmacy> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        Ok(rows.iter().map(PharmacyListItem::from).collect())
    }

    /// Dashboard counters for a pharmacy's request inbox.
    pub async fn stats(
        &self,
        pharmacy_id: Uuid,
        auth_token: &str,
    ) -> Result<PharmacyStats, QuotationError> {
        let path = format!(
            "/rest/v1/quotation_requests?pharmacy_id=eq.{}&select=status",
            pharmacy_id
        );
        let rows: Vec<StatusRow> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| QuotationError::DatabaseError(e.to_string()))?;

        let count = |status: QuotationStatus| rows.iter().filter(|r| r.status == status).count();

        Ok(PharmacyStats {
            total_requests: rows.len(),
            pending_requests: count(QuotationStatus::Pending),
            quoted_requests: count(QuotationStatus::Quoted),
            accepted_requests: count(QuotationStatus::Accepted),
        })
    }
}
