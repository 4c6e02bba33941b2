// tests/common/mod.rs

#![allow(dead_code)]

use std::net::SocketAddr;

use blogdeck::{config::Config, db, routes, state::AppState, utils::payload::MAX_FIELD_BYTES};
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub const PASSWORD: &str = "password123";

/// A field value one byte over the per-field limit.
pub fn oversized() -> String {
    "x".repeat(MAX_FIELD_BYTES + 1)
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory store.
pub async fn spawn_app(allow_signups: bool) -> TestApp {
    let pool = db::connect_and_migrate("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        max_body_bytes: 48 * 1024 * 1024,
        allow_signups,
        base_url: "http://localhost:3000".to_string(),
        platform_title: "Test Platform".to_string(),
        single_blog_auto_redirect: false,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn signup(&self, email: &str) -> reqwest::Response {
        self.post(
            "/auth/signup",
            None,
            json!({ "email": email, "password": PASSWORD, "username": email }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let body: Value = self
            .post("/auth/login", None, json!({ "email": email, "password": password }))
            .await
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Signs up `email` and returns a session token for it.
    pub async fn register(&self, email: &str) -> String {
        let response = self.signup(email).await;
        assert_eq!(response.status().as_u16(), 201, "signup of {} failed", email);
        self.login(email, PASSWORD).await
    }

    /// Creates a blog for the session user and returns its id.
    pub async fn create_blog(&self, token: &str, title: &str) -> String {
        let response = self
            .post("/blog/create", Some(token), json!({ "blogTitle": title }))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let blog: Value = response.json().await.unwrap();
        blog["id"].as_str().unwrap().to_string()
    }

    /// Creates a post in the session user's blog and returns it.
    pub async fn create_post(&self, token: &str, title: &str) -> Value {
        let response = self
            .post("/blog/posts/create", Some(token), json!({ "title": title }))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn publish(&self, token: &str, post_id: &str) {
        let response = self
            .post(
                "/blog/posts/update",
                Some(token),
                json!({ "postId": post_id, "published": true }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    pub async fn set_frozen(&self, email: &str, frozen: bool) {
        sqlx::query("UPDATE users SET frozen = ?1 WHERE email = ?2")
            .bind(frozen)
            .bind(email)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn user_flags(&self, email: &str) -> (bool, bool) {
        sqlx::query_as::<_, (bool, bool)>("SELECT admin, frozen FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
