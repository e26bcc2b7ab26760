//! Cart endpoints over HTTP, anonymous and signed in.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use cartline_integration_tests::TestApp;
use chrono::Duration;
use reqwest::StatusCode;
use serde_json::{Value, json};

const SESSION_HEADER: &str = "x-session-id";

#[tokio::test]
async fn test_anonymous_cart_gets_a_token() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/api/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let token = resp.headers()[SESSION_HEADER].to_str().unwrap().to_owned();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["sessionId"], token.as_str());
    assert_eq!(body["data"]["totalAmount"], "0.00");
    assert_eq!(body["data"]["items"], json!([]));

    // Same token, same cart.
    let again: Value = app
        .client
        .get(app.url("/api/cart"))
        .header(SESSION_HEADER, &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["data"]["id"], body["data"]["id"]);
}

#[tokio::test]
async fn test_add_update_remove() {
    let app = TestApp::spawn().await;
    let mug = app.seed_product("Mug", 1200, 10).await;
    let lamp = app.seed_product("Lamp", 3499, 3).await;
    let token = "shopper-token-1";

    let add = |product_id: i32, quantity: u32| {
        app.client
            .post(app.url("/api/cart/items"))
            .header(SESSION_HEADER, token)
            .json(&json!({ "productId": product_id, "quantity": quantity }))
            .send()
    };

    let resp = add(mug.id.as_i32(), 2).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[SESSION_HEADER], token);
    let resp = add(mug.id.as_i32(), 1).await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["items"][0]["quantity"], 3);
    assert_eq!(body["data"]["totalAmount"], "36.00");

    let body: Value = add(lamp.id.as_i32(), 1).await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["totalAmount"], "70.99");
    assert_eq!(body["data"]["itemCount"], 4);

    let body: Value = app
        .client
        .put(app.url(&format!("/api/cart/items/{}", mug.id.as_i32())))
        .header(SESSION_HEADER, token)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["totalAmount"], "34.99");

    let resp = app
        .client
        .delete(app.url(&format!("/api/cart/items/{}", lamp.id.as_i32())))
        .header(SESSION_HEADER, token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["totalAmount"], "0.00");
}

#[tokio::test]
async fn test_cart_rules_are_enforced() {
    let app = TestApp::spawn().await;
    let lamp = app.seed_product("Lamp", 3499, 3).await;
    let token = "shopper-token-2";

    let resp = app
        .client
        .post(app.url("/api/cart/items"))
        .header(SESSION_HEADER, token)
        .json(&json!({ "productId": lamp.id.as_i32(), "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .post(app.url("/api/cart/items"))
        .header(SESSION_HEADER, token)
        .json(&json!({ "productId": lamp.id.as_i32(), "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .post(app.url("/api/cart/items"))
        .header(SESSION_HEADER, token)
        .json(&json!({ "productId": 9999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .client
        .put(app.url(&format!("/api/cart/items/{}", lamp.id.as_i32())))
        .header(SESSION_HEADER, token)
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Nothing was stored.
    let body: Value = app
        .client
        .get(app.url("/api/cart"))
        .header(SESSION_HEADER, token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
async fn test_malformed_session_header_is_rejected() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/cart"))
        .header(SESSION_HEADER, "has spaces in it")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_cart_starts_empty() {
    let app = TestApp::spawn().await;
    let mug = app.seed_product("Mug", 1200, 10).await;
    let token = "shopper-token-3";

    app.client
        .post(app.url("/api/cart/items"))
        .header(SESSION_HEADER, token)
        .json(&json!({ "productId": mug.id.as_i32(), "quantity": 2 }))
        .send()
        .await
        .unwrap();

    app.clock.advance(Duration::hours(25));

    let body: Value = app
        .client
        .get(app.url("/api/cart"))
        .header(SESSION_HEADER, token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(body["data"]["totalAmount"], "0.00");
}

#[tokio::test]
async fn test_signed_in_user_ignores_session_header() {
    let app = TestApp::spawn().await;
    let mug = app.seed_product("Mug", 1200, 10).await;
    app.register(&app.client, "cart@example.com").await;

    let resp = app
        .client
        .post(app.url("/api/cart/items"))
        .header(SESSION_HEADER, "someone-elses-token")
        .json(&json!({ "productId": mug.id.as_i32() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.headers().contains_key(SESSION_HEADER));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["sessionId"], Value::Null);

    // The anonymous cart for that token is untouched.
    let other: Value = TestApp::new_client()
        .get(app.url("/api/cart"))
        .header(SESSION_HEADER, "someone-elses-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(other["data"]["items"], json!([]));
}
