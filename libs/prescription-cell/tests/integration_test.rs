use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prescription_cell::router::prescription_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

async fn create_test_app(config: AppConfig) -> Router {
    prescription_routes(Arc::new(config))
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

fn create_body(appointment_id: Uuid) -> Value {
    json!({
        "appointment_id": appointment_id,
        "diagnosis": "Seasonal influenza",
        "medicines": [
            {
                "name": "Paracetamol",
                "dosage": "500mg",
                "frequency": "1+1+1",
                "duration": "5 days",
                "instructions": "After meals"
            }
        ],
        "is_finalized": true
    })
}

#[tokio::test]
async fn create_prescription_for_completed_appointment() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                &appointment_id.to_string(),
                &patient_id.to_string(),
                &doctor.id,
                "2025-03-03",
                "10:00:00",
                "Completed"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::prescription(
                &Uuid::new_v4().to_string(),
                &appointment_id.to_string(),
                &doctor.id,
                &patient_id.to_string(),
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(create_body(appointment_id).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["is_finalized"], json!(true));
    assert_eq!(body["appointment_id"], json!(appointment_id.to_string()));
}

#[tokio::test]
async fn prescription_requires_completed_appointment() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &doctor.id,
                "2025-03-03",
                "10:00:00",
                "Confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(create_body(appointment_id).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_prescription_for_appointment_conflicts() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment(
                &appointment_id.to_string(),
                &Uuid::new_v4().to_string(),
                &doctor.id,
                "2025-03-03",
                "10:00:00",
                "Completed"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(create_body(appointment_id).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn finalized_prescription_rejects_edits() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));
    let prescription_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(
                &prescription_id.to_string(),
                &Uuid::new_v4().to_string(),
                &doctor.id,
                &Uuid::new_v4().to_string(),
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}", prescription_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "diagnosis": "Amended" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patients_see_only_finalized_prescriptions() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(wiremock::matchers::query_param("is_finalized", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &patient.id,
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config).await;
    let request = Request::builder()
        .method("GET")
        .uri("/patient/my-prescriptions")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["prescriptions"][0]["is_finalized"], json!(true));
}
