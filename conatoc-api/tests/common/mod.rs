//! Common test utilities for API integration tests
//!
//! Each test gets a fresh in-memory database with migrations applied and a
//! router built exactly as in production, driven with `oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use conatoc_api::app::{build_router, AppState};
use conatoc_api::config::{AdminConfig, ApiConfig, AuthConfig, Config, DatabaseConfig, UploadConfig};
use conatoc_shared::auth::jwt::issue_token_pair;
use conatoc_shared::db::migrations::run_migrations;
use conatoc_shared::db::pool::{self, create_pool};
use conatoc_shared::models::user::{CreateUser, Role, User};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "api-test-secret-key-at-least-32-bytes";

/// Upload cap used by the test router
pub const TEST_UPLOAD_MAX_BYTES: usize = 8 * 1024;

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        auth: AuthConfig {
            secret: TEST_SECRET.to_string(),
        },
        uploads: UploadConfig {
            max_bytes: TEST_UPLOAD_MAX_BYTES,
            staging_ttl_seconds: 3600,
        },
        admin: AdminConfig {
            email: "admin@conatoc.net".to_string(),
            password: "ChangeMeNow!".to_string(),
            name: "Admin".to_string(),
        },
    }
}

/// Test context: database plus the router under test
pub struct TestContext {
    pub db: SqlitePool,
    pub app: Router,
}

/// A member created directly in the store, with a signed access token
pub struct TestMember {
    pub user: User,
    pub token: String,
}

/// Parsed response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Expected JSON body ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let db = create_pool(pool::DatabaseConfig::in_memory())
            .await
            .expect("Failed to open in-memory database");
        run_migrations(&db).await.expect("Failed to run migrations");

        let app = build_router(AppState::new(db.clone(), test_config()));

        Self { db, app }
    }

    /// Inserts a member with the given role and signs a session for them
    ///
    /// The stored hash is not a valid Argon2 hash, so these members cannot
    /// log in with a password.
    pub async fn member(&self, email: &str, name: &str, role: Role) -> TestMember {
        let user = User::create(
            &self.db,
            CreateUser {
                email: email.to_string(),
                name: name.to_string(),
                affiliation: None,
                role,
                password_hash: "unusable".to_string(),
            },
        )
        .await
        .expect("Failed to create member");

        let (token, _) = issue_token_pair(user.id, TEST_SECRET).expect("Failed to sign token");

        TestMember { user, token }
    }

    /// Sends a request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }
}

/// Asserts an anonymous-caller redirect to the login page
pub fn assert_login_redirect(response: &TestResponse) {
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.headers.get(header::LOCATION).unwrap(), "/login");
}
