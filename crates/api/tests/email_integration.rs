//! Integration tests for the bulk email endpoint.

mod common;

use axum::http::{Method, StatusCode};
use common::{json_request, json_request_with_key, parse_response_body, test_app};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_bulk_send_explicit_recipients_skip_user_fetch() {
    let app = test_app(&[]);

    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({
            "template_id": "tmpl-7",
            "recipients": ["anna@example.com", "bela@example.com"]
        }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["recipients"], json!(2));
    assert_eq!(body["batches_sent"], json!(1));
    assert_eq!(body["batches_failed"], json!(0));

    // Explicit list means the user collection is never read.
    assert!(app.store.calls().is_empty());

    let batches = app.mailer.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].template_id, "tmpl-7");
    assert_eq!(
        batches[0].recipients,
        vec!["anna@example.com", "bela@example.com"]
    );
}

#[tokio::test]
async fn test_bulk_send_default_targets_eligible_users() {
    let app = test_app(&[]);
    app.store.seed(
        "users",
        vec![
            json!({ "id": 1, "email": "anna@example.com" }),
            json!({ "id": 2, "email": "" }),
            json!({ "id": 3, "email": "deleted.user.3@retired.invalid" }),
            json!({ "id": 4, "email": "leaving@example.com", "delete_requested": true }),
            json!({ "id": 5, "email": "stays@example.com", "delete_requested": false }),
        ],
    );

    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "tmpl-7" }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["recipients"], json!(2));

    let batches = app.mailer.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].recipients,
        vec!["anna@example.com", "stays@example.com"]
    );
}

#[tokio::test]
async fn test_bulk_send_chunks_at_configured_batch_size() {
    let app = test_app(&[("email.batch_size", "2")]);

    let recipients: Vec<String> = (0..5).map(|i| format!("user{i}@example.com")).collect();
    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "tmpl-7", "recipients": recipients }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();

    let body = parse_response_body(response).await;
    assert_eq!(body["batches_sent"], json!(3));

    let batches = app.mailer.batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].recipients.len(), 2);
    assert_eq!(batches[2].recipients.len(), 1);
}

#[tokio::test]
async fn test_bulk_send_counts_failed_batches() {
    let app = test_app(&[("email.batch_size", "2")]);
    app.mailer.fail_all();

    let recipients: Vec<String> = (0..3).map(|i| format!("user{i}@example.com")).collect();
    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "tmpl-7", "recipients": recipients }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    // Per-batch failures are accounting, not a request failure.
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["batches_sent"], json!(0));
    assert_eq!(body["batches_failed"], json!(2));
}

#[tokio::test]
async fn test_bulk_send_rejects_empty_template_id() {
    let app = test_app(&[]);

    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "", "recipients": ["anna@example.com"] }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mailer.batches().is_empty());
}

#[tokio::test]
async fn test_bulk_send_rejects_malformed_recipient() {
    let app = test_app(&[]);

    let request = json_request_with_key(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "tmpl-7", "recipients": ["not-an-email"] }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.mailer.batches().is_empty());
}

#[tokio::test]
async fn test_bulk_send_requires_service_key() {
    let app = test_app(&[]);

    let request = json_request(
        Method::POST,
        "/api/v1/email/bulk-send",
        json!({ "template_id": "tmpl-7", "recipients": ["anna@example.com"] }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.mailer.batches().is_empty());
}
