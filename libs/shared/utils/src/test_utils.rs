use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            cloudflare_realtime_app_id: String::new(),
            cloudflare_realtime_api_token: String::new(),
            cloudflare_realtime_base_url: String::new(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn pharmacy(email: &str) -> Self {
        Self::new(email, "pharmacy")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockRows;

impl MockRows {
    pub fn doctor(id: &str, full_name: &str, schedule: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "full_name": full_name,
            "specialty": "General Medicine",
            "license_number": "BMDC-10001",
            "schedule": schedule,
            "is_approved": true,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn appointment(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "status": status,
            "reason": null,
            "symptoms": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn pharmacy(id: &str, pharmacy_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "pharmacy_name": pharmacy_name,
            "owner_name": "Test Owner",
            "city": "Dhaka",
            "state": "Dhaka",
            "is_approved": true,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn prescription(
        id: &str,
        appointment_id: &str,
        doctor_id: &str,
        patient_id: &str,
        is_finalized: bool,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "appointment_id": appointment_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "diagnosis": "Seasonal influenza",
            "notes": null,
            "medicines": "[{\"name\":\"Paracetamol\",\"dosage\":\"500mg\",\"frequency\":\"1+1+1\",\"duration\":\"5 days\",\"instructions\":null}]",
            "lab_tests": "[]",
            "follow_up_date": null,
            "is_finalized": is_finalized,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn quotation_request(
        id: &str,
        prescription_id: &str,
        patient_id: &str,
        pharmacy_id: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "prescription_id": prescription_id,
            "patient_id": patient_id,
            "pharmacy_id": pharmacy_id,
            "medicines_snapshot": "[{\"name\":\"Paracetamol\",\"dosage\":\"500mg\",\"frequency\":\"1+1+1\",\"duration\":\"5 days\",\"instructions\":null}]",
            "note": null,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": null
        })
    }

    pub fn quotation_response(id: &str, request_id: &str, pharmacy_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "request_id": request_id,
            "pharmacy_id": pharmacy_id,
            "items": "[{\"medicine_name\":\"Paracetamol\",\"available\":true,\"unit_price\":2.5,\"quantity\":15,\"subtotal\":37.5,\"note\":null}]",
            "total_amount": 87.5,
            "delivery_available": true,
            "delivery_fee": 50.0,
            "notes": null,
            "valid_until": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }
}
