//! Form login, access rules and logout against the shipped users fixture.

mod common;

use reqwest::StatusCode;

use common::{location, session_cookie, spawn_app};

#[tokio::test]
async fn test_anonymous_account_redirects_to_login() {
    let app = spawn_app().await;

    let response = app.get("/account/profile", None).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_page_renders_form() {
    let app = spawn_app().await;

    let response = app.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("action=\"/login_check\""));
    assert!(body.contains("name=\"_username\""));
    assert!(!body.contains("class=\"error\""));
}

#[tokio::test]
async fn test_login_grants_account_until_logout() {
    let app = spawn_app().await;

    let response = app.login("admin", "adminpass").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let response = app.get("/account/profile", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Account: profile"));
    assert!(body.contains("admin@example.com"));
    assert!(body.contains("ROLE_USER"));

    let response = app.get("/", Some(&cookie)).await;
    assert!(response.text().await.unwrap().contains("You are an administrator."));

    let response = app.get("/login", Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let response = app.get("/logout", Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let response = app.get("/account/profile", Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_by_email_ignores_case() {
    let app = spawn_app().await;

    let response = app.login("ALICE@example.com", "alicepass").await;
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    let response = app.get("/account/settings", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Alice"));
}

#[tokio::test]
async fn test_bad_password_is_reported_once() {
    let app = spawn_app().await;

    let response = app.login("admin", "wrong").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response);

    let body = app.get("/login", Some(&cookie)).await.text().await.unwrap();
    assert!(body.contains("Bad credentials."));
    assert!(body.contains("value=\"admin\""));

    let body = app.get("/login", Some(&cookie)).await.text().await.unwrap();
    assert!(!body.contains("Bad credentials."));
}

#[tokio::test]
async fn test_unknown_user_gets_same_error() {
    let app = spawn_app().await;

    let response = app.login("nobody", "whatever").await;
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response);

    let body = app.get("/login", Some(&cookie)).await.text().await.unwrap();
    assert!(body.contains("Bad credentials."));
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in() {
    let app = spawn_app().await;

    let response = app.login("bob", "bobpass").await;
    assert_eq!(location(&response), "/login");
    let cookie = session_cookie(&response);

    let body = app.get("/login", Some(&cookie)).await.text().await.unwrap();
    assert!(body.contains("User account is disabled."));
}

#[tokio::test]
async fn test_user_role_cannot_reach_admin_area() {
    let app = spawn_app().await;

    let response = app.login("alice", "alicepass").await;
    let cookie = session_cookie(&response);

    let response = app.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
