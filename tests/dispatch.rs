//! Requests served end to end through both resolvers.

mod common;

use reqwest::StatusCode;
use serde_json::Value;

use common::spawn_app;

#[tokio::test]
async fn test_autowired_home_renders_aliased_greeting() {
    let app = spawn_app().await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.text().await.unwrap();
    assert!(body.contains("It works"));
    assert!(body.contains("ConsoleGreeting was resolved"));
    assert!(body.contains("/assets/css/site.css"));
    assert!(!body.contains("You are an administrator."));
}

#[tokio::test]
async fn test_standard_target_serves_health() {
    let app = spawn_app().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_incoming_request_id_is_kept() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/health", app.base_url))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_unrouted_path_is_not_found() {
    let app = spawn_app().await;

    let response = app.get("/no/such/page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_assets_are_served() {
    let app = spawn_app().await;

    let response = app.get("/assets/css/site.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.text().await.unwrap().is_empty());
}
