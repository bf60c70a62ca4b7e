//! Shared helpers for the integration tests: a real server on a random port,
//! backed by the in-memory store.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use postboard::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, PostSettings, Settings,
};
use postboard::startup::run;
use postboard::store::{MemoryStore, Store};
use postboard::telemetry::try_init_telemetry;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "127.0.0.1".to_string(),
            database_name: "postboard".to_string(),
            max_connections: 1,
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtSettings {
            secret: "integration-test-secret-at-least-32-chars".to_string(),
            access_token_expiry: 86_400,
            refresh_token_expiry: 604_800,
            issuer: "postboard-test".to_string(),
        },
        posts: PostSettings {
            require_fields: true,
        },
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryStore::new()), test_settings())
}

pub fn spawn_app_with_store(store: Arc<dyn Store>, settings: Settings) -> TestApp {
    try_init_telemetry();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, store, settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/user/register",
            &json!({"name": name, "email": email, "password": password}),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/user/login", &json!({"email": email, "password": password}))
            .await
    }

    /// Register and log in a fresh user, returning the token payload
    pub async fn logged_in_user(&self, email: &str) -> Value {
        let response = self.register("Tester", email, "secret123").await;
        assert_eq!(201, response.status().as_u16());

        let response = self.login(email, "secret123").await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }
}
