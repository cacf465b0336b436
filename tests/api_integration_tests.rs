//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for the cache endpoints and the
//! cached upstream proxy.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use resilient_cache::{create_router, AppState, Config, RetryConfig, UpstreamConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(&Config::default()).unwrap())
}

fn create_proxy_app(base_url: &str) -> Router {
    let config = Config {
        upstream: UpstreamConfig {
            base_url: base_url.to_string(),
            api_key: Some("snd_test".to_string()),
            timeout_ms: 2_000,
        },
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 50,
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    };
    create_router(AppState::from_config(&config).unwrap())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

async fn body_to_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_set_then_get() {
    let app = create_test_app();

    let response = send(
        &app,
        "PUT",
        "/cache/pay_1",
        Some(json!({"value": {"amount": 100, "currency": "USD"}, "ttl": 60})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("pay_1"));

    let response = send(&app, "GET", "/cache/pay_1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["key"], "pay_1");
    assert_eq!(json["value"]["currency"], "USD");
    let ttl = json["ttl"].as_i64().unwrap();
    assert!(ttl > 0 && ttl <= 60);
}

#[tokio::test]
async fn test_get_not_found() {
    let app = create_test_app();

    let response = send(&app, "GET", "/cache/missing", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/cache/k", Some(json!({"value": 1}))).await;

    let response = send(&app, "DELETE", "/cache/k", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "DELETE", "/cache/k", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let request = Request::builder()
        .method("PUT")
        .uri("/cache/k")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_ttl_out_of_range() {
    let app = create_test_app();

    let response = send(&app, "PUT", "/cache/k", Some(json!({"value": 1, "ttl": 86_401}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/cache/a", Some(json!({"value": "x"}))).await;
    send(&app, "GET", "/cache/a", None).await;
    send(&app, "GET", "/cache/a", None).await;
    send(&app, "GET", "/cache/b", None).await;

    let response = send(&app, "GET", "/stats", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;

    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["entryCount"], 1);
    assert_eq!(json["mostAccessed"], "a");
    let hit_rate = json["hitRate"].as_f64().unwrap();
    assert!((hit_rate - 66.666).abs() < 0.01);
}

#[tokio::test]
async fn test_keys_and_clear() {
    let app = create_test_app();
    for key in ["first", "second"] {
        send(&app, "PUT", &format!("/cache/{}", key), Some(json!({"value": key}))).await;
    }

    let json = body_to_json(send(&app, "GET", "/keys", None).await).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["keys"], json!(["first", "second"]));

    let json = body_to_json(send(&app, "DELETE", "/cache", None).await).await;
    assert_eq!(json["cleared"], 2);

    let json = body_to_json(send(&app, "GET", "/keys", None).await).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_export_import_between_instances() {
    let source = create_test_app();
    send(&source, "PUT", "/cache/pay_1", Some(json!({"value": {"id": 1}, "ttl": 120}))).await;

    let snapshot = body_to_json(send(&source, "GET", "/export", None).await).await;
    assert_eq!(snapshot["pay_1"]["value"]["id"], 1);
    assert!(snapshot["pay_1"]["expiresAt"].as_u64().is_some());

    let target = create_test_app();
    let json = body_to_json(send(&target, "POST", "/import", Some(snapshot.clone())).await).await;
    assert_eq!(json["imported"], 1);

    let exported_again = body_to_json(send(&target, "GET", "/export", None).await).await;
    assert_eq!(exported_again, snapshot);
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = send(&create_test_app(), "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();
    send(&app, "PUT", "/cache/short", Some(json!({"value": 1, "ttl": 1}))).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = send(&app, "GET", "/cache/short", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_to_json(send(&app, "GET", "/stats", None).await).await;
    assert_eq!(json["expirations"], 1);
}

// == Proxy Endpoint Tests ==

#[tokio::test]
async fn test_proxy_get_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/pay_1"))
        .and(header("api-key", "snd_test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"payment_id": "pay_1", "status": "succeeded"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = create_proxy_app(&server.uri());

    for _ in 0..3 {
        let response = send(&app, "GET", "/api/payments/pay_1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_to_json(response).await["status"], "succeeded");
    }

    let json = body_to_json(send(&app, "GET", "/keys", None).await).await;
    assert_eq!(json["keys"], json!(["GET:/payments/pay_1"]));
}

#[tokio::test]
async fn test_proxy_forwards_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_proxy_app(&server.uri());
    let response = send(&app, "GET", "/api/payments?limit=5", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await, json!({"data": []}));
}

#[tokio::test]
async fn test_proxy_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "invalid_request", "message": "Payment not found", "code": "HE_02"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_proxy_app(&server.uri());
    let response = send(&app, "GET", "/api/payments/missing", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response).await;
    assert_eq!(json["message"], "Payment not found");
    assert_eq!(json["statusCode"], 404);
    assert_eq!(json["errorCode"], "HE_02");
    assert_eq!(json["errorType"], "invalid_request");

    let json = body_to_json(send(&app, "GET", "/keys", None).await).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_proxy_exhausted_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/pay_1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let app = create_proxy_app(&server.uri());
    let response = send(&app, "GET", "/api/payments/pay_1", None).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response).await;
    assert_eq!(json["errorCode"], "MAX_RETRIES_EXCEEDED");
    assert_eq!(json["statusCode"], 503);
}

#[tokio::test]
async fn test_proxy_write_invalidates_cached_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payments/pay_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "requires_capture"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payments/pay_1/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_proxy_app(&server.uri());

    send(&app, "GET", "/api/payments/pay_1", None).await;
    send(&app, "GET", "/api/payments/pay_1", None).await;

    let response = send(
        &app,
        "POST",
        "/api/payments/pay_1/capture",
        Some(json!({"amount_to_capture": 100})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["status"], "succeeded");

    // Cached read was dropped, so this goes upstream again
    send(&app, "GET", "/api/payments/pay_1", None).await;
}

#[tokio::test]
async fn test_proxy_rejects_invalid_body() {
    let server = MockServer::start().await;
    let app = create_proxy_app(&server.uri());

    let request = Request::builder()
        .method("POST")
        .uri("/api/refunds")
        .header("content-type", "application/json")
        .body(Body::from("{broken"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_to_json(response).await["errorCode"], "INVALID_REQUEST");
}
