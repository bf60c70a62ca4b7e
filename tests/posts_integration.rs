mod common;

use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn create_post(app: &TestApp, token: &str, title: &str, content: &str) -> reqwest::Response {
    app.client
        .post(app.url("/post"))
        .bearer_auth(token)
        .json(&json!({"title": title, "content": content}))
        .send()
        .await
        .unwrap()
}

async fn get_post(app: &TestApp, id: &str) -> reqwest::Response {
    app.client
        .get(app.url(&format!("/post?id={}", id)))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn create_requires_login() {
    let app = spawn_app();

    let response = app
        .client
        .post(app.url("/post"))
        .json(&json!({"title": "t", "content": "c"}))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn created_post_is_readable() {
    let app = spawn_app();
    let tokens = app.logged_in_user("writer@example.com").await;
    let token = tokens["access_token"].as_str().unwrap();

    let response = create_post(&app, token, "Hello", "World").await;
    assert_eq!(201, response.status().as_u16());
    let created: Value = response.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap();

    let response = get_post(&app, id).await;
    assert_eq!(200, response.status().as_u16());
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched["data"]["title"], "Hello");
    assert_eq!(fetched["data"]["content"], "World");

    let listed: Value = app
        .client
        .get(app.url("/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let app = spawn_app();
    let tokens = app.logged_in_user("writer@example.com").await;

    let response = create_post(&app, tokens["access_token"].as_str().unwrap(), "", "x").await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "title is required");
}

#[tokio::test]
async fn update_changes_post_and_404s_on_missing() {
    let app = spawn_app();
    let tokens = app.logged_in_user("writer@example.com").await;
    let token = tokens["access_token"].as_str().unwrap();

    let created: Value = create_post(&app, token, "a", "b").await.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap();

    let response = app
        .client
        .put(app.url("/post"))
        .bearer_auth(token)
        .json(&json!({"id": id, "title": "c", "content": "d"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["data"]["title"], "c");

    let response = app
        .client
        .put(app.url("/post"))
        .bearer_auth(token)
        .json(&json!({"id": uuid::Uuid::new_v4(), "title": "c", "content": "d"}))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn delete_hides_post_and_is_idempotent() {
    let app = spawn_app();
    let tokens = app.logged_in_user("writer@example.com").await;
    let token = tokens["access_token"].as_str().unwrap();

    let created: Value = create_post(&app, token, "a", "b").await.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = app
            .client
            .delete(app.url(&format!("/post?id={}", id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
    }

    assert_eq!(404, get_post(&app, &id).await.status().as_u16());
}

#[tokio::test]
async fn malformed_post_id_is_400() {
    let app = spawn_app();

    let response = get_post(&app, "not-a-uuid").await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}
