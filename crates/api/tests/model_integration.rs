//! Integration tests for the image analysis pipeline.
//!
//! These run against in-memory stores and a mock vision model; no database
//! or Ollama instance is needed.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{
    caller_request, parse_response_body, subscription_for, test_config, test_harness,
    CALM_ANSWER, CRITICAL_ANSWER, TINY_PNG_BASE64,
};
use drishti_api::services::MockVisionModel;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

fn analyze_body() -> serde_json::Value {
    json!({
        "image": TINY_PNG_BASE64,
        "prompt": "Describe any hazards in front of me",
        "sessionId": "walk-1"
    })
}

// ============================================================================
// Analysis Tests
// ============================================================================

#[tokio::test]
async fn test_analyze_critical_answer_raises_alert_and_emails_relative() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CRITICAL_ANSWER));
    let user_id = Uuid::new_v4();
    harness
        .subscriptions
        .insert(subscription_for(user_id, Uuid::new_v4(), "asha@example.com"))
        .await;

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            user_id,
            Some(analyze_body()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["model"], "mock-vision");
    assert_eq!(body["sessionId"], "walk-1");
    assert_eq!(body["response"], CRITICAL_ANSWER);
    assert_eq!(body["alert"]["detected"], true);
    assert_eq!(body["alert"]["severity"], "critical");
    assert_eq!(body["alert"]["type"], "life-threat");
    assert!(body["alert"]["alertId"].is_string());

    let vehicle = body["detectedObjects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["category"] == "vehicle")
        .expect("vehicle should be detected");
    assert_eq!(vehicle["distance"], "5 meters");

    let alerts = harness.alerts.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].user_id, user_id);
    assert_eq!(alerts[0].alert_id.to_string(), body["alert"]["alertId"]);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient_email, "asha@example.com");
    assert_eq!(sent[0].user_name, "Ravi");
}

#[tokio::test]
async fn test_analyze_calm_answer_raises_no_alert() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CALM_ANSWER));

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            Uuid::new_v4(),
            Some(analyze_body()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["alert"]["detected"], false);
    assert_eq!(body["alert"]["severity"], "low");
    assert!(body["alert"]["alertId"].is_null());
    assert!(harness.alerts.alerts().await.is_empty());
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_analyze_without_caller_is_unauthorized() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CRITICAL_ANSWER));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/model/analyze")
        .header("Content-Type", "application/json")
        .body(Body::from(analyze_body().to_string()))
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.vision.calls(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_invalid_image() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CRITICAL_ANSWER));

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            Uuid::new_v4(),
            Some(json!({"image": "not an image at all, just words", "prompt": "Describe"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.vision.calls(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_blank_prompt() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CRITICAL_ANSWER));

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            Uuid::new_v4(),
            Some(json!({"image": TINY_PNG_BASE64, "prompt": "   "})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_analyze_when_model_unavailable() {
    let harness = test_harness(test_config(10), MockVisionModel::unavailable());

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            Uuid::new_v4(),
            Some(analyze_body()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(harness.alerts.alerts().await.is_empty());
}

#[tokio::test]
async fn test_analyze_rate_limited_per_user() {
    let harness = test_harness(test_config(2), MockVisionModel::new(CALM_ANSWER));
    let user_id = Uuid::new_v4();

    for _ in 0..2 {
        let response = harness
            .app
            .clone()
            .oneshot(caller_request(
                Method::POST,
                "/api/v1/model/analyze",
                user_id,
                Some(analyze_body()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            user_id,
            Some(analyze_body()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Another user still has a full quota
    let response = harness
        .app
        .clone()
        .oneshot(caller_request(
            Method::POST,
            "/api/v1/model/analyze",
            Uuid::new_v4(),
            Some(analyze_body()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.vision.calls(), 3);
}

// ============================================================================
// Health Tests
// ============================================================================

#[tokio::test]
async fn test_model_health_reports_availability() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CALM_ANSWER));
    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/model/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["model"], "mock-vision");

    let harness = test_harness(test_config(10), MockVisionModel::unavailable());
    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/model/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_liveness_probe_echoes_request_id() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CALM_ANSWER));
    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health/live")
                .header("X-Request-ID", "req-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-1");
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_caller_routes_require_identity() {
    let harness = test_harness(test_config(10), MockVisionModel::new(CALM_ANSWER));

    for uri in ["/api/v1/alerts", "/api/v1/alerts/stats", "/api/v1/subscriptions"] {
        let response = harness
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/alerts")
                .header("X-User-Id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
