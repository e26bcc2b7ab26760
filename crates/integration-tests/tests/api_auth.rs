//! Account endpoints over HTTP: registration, sessions, `me`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use cartline_integration_tests::{TEST_PASSWORD, TestApp};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = app.client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "edge-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "edge-42");
}

#[tokio::test]
async fn test_register_signs_in() {
    let app = TestApp::spawn().await;

    let body = app.register(&app.client, "Ada@Example.com").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert_eq!(body["data"]["role"], "customer");
    assert!(body["data"].get("passwordHash").is_none());

    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["data"]["firstName"], "Test");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    app.register(&app.client, "dup@example.com").await;

    let resp = TestApp::new_client()
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "email": "DUP@example.com",
            "password": TEST_PASSWORD,
            "firstName": "Again",
            "lastName": "Again",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "email": "short@example.com",
            "password": "abc",
            "firstName": "A",
            "lastName": "B",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "email": "no-password@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::spawn().await;
    app.register(&TestApp::new_client(), "grace@example.com").await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "grace@example.com", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.login(&app.client, "grace@example.com").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.client.post(app.url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_email_is_invalid_credentials() {
    let app = TestApp::spawn().await;

    let resp = app.login(&app.client, "nobody@example.com").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials");
}
