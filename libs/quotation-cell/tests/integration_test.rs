use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quotation_cell::router::quotation_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

async fn create_test_app(config: AppConfig) -> Router {
    quotation_routes(Arc::new(config))
}

fn test_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed_request(token: &str, uri: &str, method_name: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method_name)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");

    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// ==============================================================================
// REQUEST CREATION
// ==============================================================================

#[tokio::test]
async fn create_request_snapshots_medicines() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let prescription_id = Uuid::new_v4();
    let pharmacy_id = Uuid::new_v4();
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("is_finalized", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(
                &prescription_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/pharmacies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": pharmacy_id }
        ])))
        .mount(&mock_server)
        .await;

    // No active request exists for this (prescription, patient, pharmacy).
    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &prescription_id.to_string(),
                &patient.id,
                &pharmacy_id.to_string(),
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/request",
        "POST",
        Some(json!({
            "prescription_id": prescription_id,
            "pharmacy_id": pharmacy_id,
            "note": "Please quote with delivery"
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["status"], json!("pending"));
    assert!(body["medicines_snapshot"]
        .as_str()
        .unwrap()
        .contains("Paracetamol"));
}

#[tokio::test]
async fn create_request_rejects_duplicate_active_request() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let prescription_id = Uuid::new_v4();
    let pharmacy_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(
                &prescription_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/pharmacies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": pharmacy_id }
        ])))
        .mount(&mock_server)
        .await;

    // A pending request already exists.
    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &Uuid::new_v4().to_string(),
                &prescription_id.to_string(),
                &patient.id,
                &pharmacy_id.to_string(),
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/request",
        "POST",
        Some(json!({
            "prescription_id": prescription_id,
            "pharmacy_id": pharmacy_id
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_request_requires_finalized_owned_prescription() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));

    // The finalized+owned filter matches nothing.
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/request",
        "POST",
        Some(json!({
            "prescription_id": Uuid::new_v4(),
            "pharmacy_id": Uuid::new_v4()
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==============================================================================
// RESPONSE SUBMISSION
// ==============================================================================

#[tokio::test]
async fn submit_response_moves_request_to_quoted() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let pharmacy = TestUser::pharmacy("pharmacy@example.com");
    let token = JwtTestUtils::create_test_token(&pharmacy, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();
    let response_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &pharmacy.id,
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/quotation_responses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::quotation_response(
                &response_id.to_string(),
                &request_id.to_string(),
                &pharmacy.id
            )
        ])))
        .mount(&mock_server)
        .await;

    // The pending -> quoted compare-and-set.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/quotation_requests"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &pharmacy.id,
                "quoted"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/pharmacy/respond",
        "POST",
        Some(json!({
            "request_id": request_id,
            "items": [
                {
                    "medicine_name": "Paracetamol",
                    "available": true,
                    "unit_price": 2.5,
                    "quantity": 15,
                    "subtotal": 37.5,
                    "note": null
                }
            ],
            "total_amount": 87.5,
            "delivery_available": true,
            "delivery_fee": 50.0
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["request_id"], json!(request_id.to_string()));
    // Total covers the item subtotals plus the delivery fee.
    assert_eq!(body["total_amount"], json!(87.5));
    assert_eq!(body["delivery_fee"], json!(50.0));
}

#[tokio::test]
async fn second_response_for_same_request_conflicts() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let pharmacy = TestUser::pharmacy("pharmacy@example.com");
    let token = JwtTestUtils::create_test_token(&pharmacy, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &pharmacy.id,
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    // The 1:1 guard finds an existing response.
    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_response(
                &Uuid::new_v4().to_string(),
                &request_id.to_string(),
                &pharmacy.id
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/pharmacy/respond",
        "POST",
        Some(json!({
            "request_id": request_id,
            "items": [],
            "total_amount": 0.0,
            "delivery_available": false,
            "delivery_fee": 0.0
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn responding_to_non_pending_request_is_invalid() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let pharmacy = TestUser::pharmacy("pharmacy@example.com");
    let token = JwtTestUtils::create_test_token(&pharmacy, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &pharmacy.id,
                "quoted"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/pharmacy/respond",
        "POST",
        Some(json!({
            "request_id": request_id,
            "items": [],
            "total_amount": 0.0,
            "delivery_available": false,
            "delivery_fee": 0.0
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_request_is_invisible_to_pharmacy() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let pharmacy = TestUser::pharmacy("pharmacy@example.com");
    let token = JwtTestUtils::create_test_token(&pharmacy, &config.supabase_jwt_secret, Some(24));

    // Ownership filter matches nothing.
    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        "/pharmacy/respond",
        "POST",
        Some(json!({
            "request_id": Uuid::new_v4(),
            "items": [],
            "total_amount": 0.0,
            "delivery_available": false,
            "delivery_fee": 0.0
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==============================================================================
// ACCEPT / REJECT
// ==============================================================================

#[tokio::test]
async fn accept_requires_quoted_status() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &Uuid::new_v4().to_string(),
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        &format!("/patient/{}/accept", request_id),
        "PATCH",
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accept_quoted_request_succeeds() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();
    let pharmacy_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &pharmacy_id,
                "quoted"
            )
        ])))
        .mount(&mock_server)
        .await;

    // CAS keyed on the quoted status.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/quotation_requests"))
        .and(query_param("status", "eq.quoted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &pharmacy_id,
                "accepted"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        &format!("/patient/{}/accept", request_id),
        "PATCH",
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("accepted"));
}

#[tokio::test]
async fn accepted_request_cannot_be_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &Uuid::new_v4().to_string(),
                "accepted"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        &format!("/patient/{}/reject", request_id),
        "PATCH",
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_request_can_be_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));
    let request_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &Uuid::new_v4().to_string(),
                "pending"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/quotation_requests"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::quotation_request(
                &request_id.to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                &Uuid::new_v4().to_string(),
                "rejected"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(
        &token,
        &format!("/patient/{}/reject", request_id),
        "PATCH",
        None,
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("rejected"));
}

// ==============================================================================
// DIRECTORY AND STATS
// ==============================================================================

#[tokio::test]
async fn pharmacy_directory_lists_approved_pharmacies() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/pharmacies"))
        .and(query_param("is_approved", "eq.true"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::pharmacy(&Uuid::new_v4().to_string(), "City Care Pharmacy"),
            MockRows::pharmacy(&Uuid::new_v4().to_string(), "Lazz Pharma")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(&token, "/pharmacies", "GET", None);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["pharmacy_name"], json!("City Care Pharmacy"));
}

#[tokio::test]
async fn pharmacy_stats_count_by_status() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let pharmacy = TestUser::pharmacy("pharmacy@example.com");
    let token = JwtTestUtils::create_test_token(&pharmacy, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/quotation_requests"))
        .and(query_param("select", "status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "status": "pending" },
            { "status": "pending" },
            { "status": "quoted" },
            { "status": "accepted" },
            { "status": "rejected" }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = authed_request(&token, "/pharmacy/stats", "GET", None);

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_requests"], json!(5));
    assert_eq!(body["pending_requests"], json!(2));
    assert_eq!(body["quoted_requests"], json!(1));
    assert_eq!(body["accepted_requests"], json!(1));
}
