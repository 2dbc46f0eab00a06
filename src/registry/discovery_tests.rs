//! Integration tests for `RegistryClient` against a mock discovery endpoint.

use super::RegistryClient;
use crate::capability::CapabilityKind;
use crate::error::ErrorCategory;
use crate::transport::ReqwestTransport;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout_secs: u64) -> RegistryClient {
    RegistryClient::new(
        Arc::new(ReqwestTransport::new()),
        format!("{}/api/models", server.uri()),
        Duration::from_secs(timeout_secs),
    )
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "deepseek-api": {"available": true, "type": "cloud", "description": "x"},
            "local-llama3": {"available": false, "type": "local", "description": "y"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server, 2).fetch_registry().await;
    let caps = result.unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(caps.len(), 2);
    assert_eq!(caps[0].id(), "deepseek-api");
    assert_eq!(caps[0].kind(), CapabilityKind::Remote);
    assert_eq!(caps[1].id(), "local-llama3");
    assert!(!caps[1].is_available());
}

#[tokio::test]
async fn test_fetch_server_error_is_registry_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let result = client_for(&server, 2).fetch_registry().await;
    match result {
        Err(failure) => {
            assert_eq!(failure.category(), ErrorCategory::RegistryError);
            assert!(failure.detail().contains("503"), "detail: {}", failure.detail());
        }
        Ok(caps) => panic!("Expected RegistryError, got {} capabilities", caps.len()),
    }
}

#[tokio::test]
async fn test_fetch_html_body_is_registry_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<!doctype html><html></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let result = client_for(&server, 2).fetch_registry().await;
    match result {
        Err(failure) => {
            assert_eq!(failure.category(), ErrorCategory::RegistryError);
            assert!(failure.detail().contains("text/html"));
        }
        Ok(_) => panic!("Expected RegistryError for HTML body"),
    }
}

#[tokio::test]
async fn test_fetch_json_array_is_registry_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["deepseek-api"])))
        .mount(&server)
        .await;

    let result = client_for(&server, 2).fetch_registry().await;
    assert!(matches!(
        result.map_err(|f| f.category()),
        Err(ErrorCategory::RegistryError)
    ));
}

#[tokio::test]
async fn test_fetch_timeout_is_registry_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let result = client_for(&server, 1).fetch_registry().await;
    match result {
        Err(failure) => {
            assert_eq!(failure.category(), ErrorCategory::RegistryError);
            assert!(failure.detail().contains("timed out"));
        }
        Ok(_) => panic!("Expected timeout"),
    }
}

#[tokio::test]
async fn test_fetch_connection_refused_is_registry_error() {
    let client = RegistryClient::new(
        Arc::new(ReqwestTransport::new()),
        "http://localhost:59998/api/models",
        Duration::from_secs(1),
    );

    let result = client.fetch_registry().await;
    assert!(matches!(
        result.map_err(|f| f.category()),
        Err(ErrorCategory::RegistryError)
    ));
}

#[tokio::test]
async fn test_each_call_issues_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    assert!(client.fetch_registry().await.is_err());
    assert!(client.fetch_registry().await.is_err());
    // Mock expectations are verified when `server` drops.
}
