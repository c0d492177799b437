//! End-to-end tests for the HTTP routes, driven through the router with a
//! simulated scale behind the service.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{assert_json_contains, connected_scale, scale_service};
use scale_bridge::{
    rest_api::{build_router, RestContext},
    MockConnector, ScaleService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app(service: &ScaleService) -> Router {
    build_router(RestContext::new(service.clone()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (service, connector) = scale_service();
    let response = app(&service).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/read"));
    assert!(html.contains("/get_settings"));
    assert!(html.contains("/update_settings"));
    assert_eq!(connector.open_attempts(), 0);
}

#[tokio::test]
async fn test_get_settings() {
    let (service, _connector) = scale_service();
    let (status, body) = send(app(&service), get("/get_settings")).await;

    assert_eq!(status, StatusCode::OK);
    assert_json_contains(
        &body,
        &json!({
            "status": "ok",
            "settings": {
                "port": "MOCK0",
                "baud_rate": 9600,
                "parity": "even",
                "stop_bits": 1,
                "byte_size": 7
            }
        }),
    );
}

#[tokio::test]
async fn test_update_settings_via_query() {
    let (service, _connector) = scale_service();
    let (status, body) = send(
        app(&service),
        get("/update_settings?baud_rate=9600&parity=none&stop_bits=1.5"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_json_contains(
        &body,
        &json!({
            "status": "ok",
            "errors": {},
            "connected": true,
            "settings": {"baud_rate": 9600, "parity": "none", "stop_bits": 1.5}
        }),
    );
    assert!(service.is_open());
}

#[tokio::test]
async fn test_update_settings_via_form_post() {
    let (service, _connector) = scale_service();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/update_settings")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("parity=invalid&byte_size=8&unknown=1"))
        .unwrap();

    let (status, body) = send(app(&service), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_json_contains(
        &body,
        &json!({
            "status": "error",
            "applied": ["byte_size"],
            "errors": {"parity": {"given_value": "invalid"}},
            "settings": {"parity": "even", "byte_size": 8}
        }),
    );
}

#[tokio::test]
async fn test_update_settings_reports_connection_error() {
    let connector = MockConnector::with_ports(["COM3"]);
    let service = ScaleService::new(Arc::new(connector), common::fast_config("COM3"));

    let (status, body) = send(app(&service), get("/update_settings?port=COM42")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["connected"], false);
    assert_eq!(body["settings"]["port"], "COM42");
    let message = body["connection_error"].as_str().unwrap();
    assert!(message.contains("COM42"));
}

#[tokio::test]
async fn test_read_returns_scale_payload() {
    let (service, _connector) = connected_scale(b"  3.10 lb\r", Duration::from_millis(2));
    let (status, body) = send(app(&service), get("/read")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "data": "  3.10 lb\r", "bytes_read": 10})
    );
}

#[tokio::test]
async fn test_read_when_not_connected() {
    let (service, connector) = scale_service();
    let (status, body) = send(app(&service), get("/read")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_json_contains(
        &body,
        &json!({"status": "error", "error": {"type": "NotConnected"}}),
    );
    assert_eq!(connector.write_count(), 0);
}

#[tokio::test]
async fn test_read_failure_kinds_are_preserved() {
    let (service, connector) = connected_scale(b"1", Duration::ZERO);
    connector.fail_next_write();
    let (status, body) = send(app(&service), get("/read")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "WriteFailed");

    service.connect();
    connector.timeout_next_write();
    let (status, body) = send(app(&service), get("/read")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["type"], "Timeout");

    service.connect();
    connector.fail_next_read();
    let (status, body) = send(app(&service), get("/read")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "ReadFailed");
}

#[tokio::test]
async fn test_list_ports() {
    let connector = MockConnector::with_ports(["COM3", "COM4"]);
    let service = ScaleService::new(Arc::new(connector), common::fast_config("COM3"));

    let (status, body) = send(app(&service), get("/ports")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "ports": ["COM3", "COM4"]}));
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (service, _connector) = scale_service();
    let request = Request::builder()
        .uri("/get_settings")
        .header(header::ORIGIN, "https://shipping.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app(&service).oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}

#[tokio::test]
async fn test_update_settings_via_multipart_post() {
    let (service, _connector) = scale_service();
    let body = concat!(
        "--XX\r\n",
        "Content-Disposition: form-data; name=\"parity\"\r\n\r\n",
        "odd\r\n",
        "--XX\r\n",
        "Content-Disposition: form-data; name=\"baud_rate\"\r\n\r\n",
        "4800\r\n",
        "--XX--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/update_settings")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(app(&service), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_json_contains(
        &body,
        &json!({
            "status": "ok",
            "applied": ["baud_rate", "parity"],
            "settings": {"parity": "odd", "baud_rate": 4800}
        }),
    );
    assert_eq!(service.settings().parity.as_str(), "odd");
}

#[tokio::test]
async fn test_repeated_query_key_keeps_first_value() {
    let (service, _connector) = scale_service();
    let (status, body) = send(
        app(&service),
        get("/update_settings?parity=odd&parity=none"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_json_contains(
        &body,
        &json!({"status": "ok", "applied": ["parity"], "settings": {"parity": "odd"}}),
    );
}

#[tokio::test]
async fn test_repeated_form_key_keeps_first_value() {
    let (service, _connector) = scale_service();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/update_settings")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("byte_size=6&byte_size=8"))
        .unwrap();

    let (status, body) = send(app(&service), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["byte_size"], 6);
}

#[tokio::test]
async fn test_unsupported_body_reports_json_error() {
    let (service, connector) = scale_service();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/update_settings")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("parity=odd"))
        .unwrap();

    let (status, body) = send(app(&service), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_json_contains(
        &body,
        &json!({"status": "error", "error": {"type": "BadRequest"}}),
    );
    assert_eq!(connector.open_attempts(), 0);
}

#[tokio::test]
async fn test_malformed_multipart_reports_json_error() {
    let (service, connector) = scale_service();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/update_settings")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
        .body(Body::from("--XX\r\nContent-Disposition: form-data; name=\"parity\"\r\n\r\nodd"))
        .unwrap();

    let (status, body) = send(app(&service), request).await;

    assert!(status.is_client_error(), "{status}");
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["type"], "BadRequest");
    assert_eq!(connector.open_attempts(), 0);
}
