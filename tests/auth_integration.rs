mod common;

use common::spawn_app;
use serde_json::{json, Value};

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_with_normalized_email() {
    let app = spawn_app();

    let response = app.register("A", " User@Ex.com ", "secret123").await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "user@ex.com");
    assert_eq!(body["data"]["name"], "A");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app();

    let first = app.register("A", "john@example.com", "secret123").await;
    assert_eq!(201, first.status().as_u16());

    let second = app.register("B", "  JOHN@example.COM", "other-pass").await;
    assert_eq!(409, second.status().as_u16());
    assert!(second.headers().contains_key("x-request-id"));

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({"name": "A", "email": "", "password": "secret123"}), "empty email"),
        (json!({"name": "A", "email": "not-an-email", "password": "secret123"}), "bad email"),
        (json!({"name": "A", "email": "a@example.com", "password": ""}), "empty password"),
        (json!({"email": "a@example.com", "password": "secret123"}), "missing name"),
    ];

    for (body, description) in test_cases {
        let response = app.post_json("/user/register", &body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request for {}.",
            description
        );
    }
}

#[tokio::test]
async fn malformed_json_gets_enveloped_400() {
    let app = spawn_app();

    let response = app
        .client
        .post(app.url("/user/register"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_token_pair() {
    let app = spawn_app();
    app.register("A", " User@Ex.com ", "secret123").await;

    let response = app.login("USER@ex.com", "secret123").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["token_type"], "Bearer");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register("A", "john@example.com", "secret123").await;

    let wrong_password = app.login("john@example.com", "wrong-pass").await;
    let unknown_email = app.login("nobody@example.com", "secret123").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_email: Value = unknown_email.json().await.unwrap();
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["message"], "invalid email/password");
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_issues_new_access_token_and_keeps_refresh_token() {
    let app = spawn_app();
    let tokens = app.logged_in_user("john@example.com").await;

    let response = app
        .post_json("/auth/refresh", &json!({"refresh_token": tokens["refresh_token"]}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["refresh_token"], tokens["refresh_token"]);
    assert_ne!(body["data"]["access_token"], tokens["access_token"]);

    // The new access token works
    let me = app
        .client
        .get(app.url("/user/me"))
        .bearer_auth(body["data"]["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(200, me.status().as_u16());
}

#[tokio::test]
async fn refresh_with_garbage_returns_401() {
    let app = spawn_app();

    let response = app
        .post_json("/auth/refresh", &json!({"refresh_token": "garbage"}))
        .await;

    assert_eq!(401, response.status().as_u16());
}

// --- Authentication Gate Tests ---

#[tokio::test]
async fn me_requires_login() {
    let app = spawn_app();

    let response = app.client.get(app.url("/user/me")).send().await.unwrap();

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn me_returns_profile_for_valid_token() {
    let app = spawn_app();
    let tokens = app.logged_in_user("john@example.com").await;

    let response = app
        .client
        .get(app.url("/user/me"))
        .bearer_auth(tokens["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["email"], "john@example.com");
}

#[tokio::test]
async fn bad_authorization_headers_are_rejected() {
    let app = spawn_app();
    let tokens = app.logged_in_user("john@example.com").await;
    let access = tokens["access_token"].as_str().unwrap();

    let test_cases = vec![
        (access.to_string(), "no scheme"),
        (format!("Token {}", access), "wrong scheme"),
        ("Bearer ".to_string(), "empty token"),
        ("Bearer not.a.jwt".to_string(), "malformed token"),
        (format!("Bearer {}x", access), "tampered token"),
    ];

    for (header, description) in test_cases {
        let response = app
            .client
            .get(app.url("/user/me"))
            .header("Authorization", header)
            .send()
            .await
            .unwrap();

        assert_eq!(
            401,
            response.status().as_u16(),
            "The API did not fail with 401 for {}.",
            description
        );
    }
}

#[tokio::test]
async fn public_routes_allow_anonymous_requests() {
    let app = spawn_app();

    let response = app.client.get(app.url("/posts")).send().await.unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"], json!([]));
}
