//! Common test utilities for integration tests.
//!
//! Tests run the full router against the in-memory record store and the
//! recording mailer, so no network or disk state beyond the export
//! directory is involved.

// Allow dead code in this module - these are helper utilities that may not be used
// by all integration tests but are intentionally available for future use.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use serde_json::Value;

use domain::services::{InMemoryRecordStore, MockMailer};
use loyalty_relay_api::{app::create_app, config::Config};

/// Service key the test configuration expects.
pub const TEST_SERVICE_KEY: &str = "test-service-key";

/// The router plus handles to the doubles behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRecordStore>,
    pub mailer: Arc<MockMailer>,
}

/// Builds the application with the embedded test configuration and
/// in-memory doubles. Exports are written under a per-run temp directory.
pub fn test_app(overrides: &[(&str, &str)]) -> TestApp {
    let exports_dir = std::env::temp_dir()
        .join(format!("lr-exports-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();

    let mut with_exports: Vec<(&str, &str)> = vec![("exports.dir", &exports_dir)];
    with_exports.extend_from_slice(overrides);

    let config = Config::load_for_test(&with_exports).expect("Failed to load test config");
    let store = Arc::new(InMemoryRecordStore::new());
    let mailer = Arc::new(MockMailer::new());
    let router = create_app(config, store.clone(), mailer.clone());

    TestApp {
        router,
        store,
        mailer,
    }
}

/// GET request without any credential.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// JSON request carrying the test service key.
pub fn json_request_with_key(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", TEST_SERVICE_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON request without the service key header.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Empty-bodied POST carrying the test service key.
pub fn post_request_with_key(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("X-API-Key", TEST_SERVICE_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Empty-bodied POST without any credential.
pub fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Reads the whole response body as bytes.
pub async fn response_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body")
        .to_vec()
}

/// Reads the whole response body as JSON.
pub async fn parse_response_body(response: Response<Body>) -> Value {
    let bytes = response_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}

/// Parses CSV response bytes into rows of cells (header row included).
pub fn parse_csv(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes);
    reader
        .records()
        .map(|record| {
            record
                .expect("Malformed CSV in response")
                .iter()
                .map(|cell| cell.to_string())
                .collect()
        })
        .collect()
}
