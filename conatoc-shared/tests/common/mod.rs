//! Shared helpers for the core integration tests
//!
//! Every test gets its own in-memory SQLite database with migrations applied.

#![allow(dead_code)]

use std::time::Duration;

use conatoc_shared::auth::authorization::Actor;
use conatoc_shared::db::migrations::run_migrations;
use conatoc_shared::db::pool::{create_pool, DatabaseConfig};
use conatoc_shared::models::user::{CreateUser, Role, User};
use conatoc_shared::staging::UploadStaging;
use sqlx::SqlitePool;

/// Staging cap used by tests
pub const TEST_UPLOAD_MAX_BYTES: usize = 64 * 1024;

/// Fresh migrated in-memory database
pub async fn setup_pool() -> SqlitePool {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create in-memory pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn setup_staging() -> UploadStaging {
    UploadStaging::new(TEST_UPLOAD_MAX_BYTES, Duration::from_secs(3600))
}

/// Inserts a member directly, skipping password hashing
///
/// The stored hash is not a valid Argon2 string, so these members cannot log
/// in; use `identity::register` for login tests.
pub async fn create_member(pool: &SqlitePool, email: &str, name: &str, role: Role) -> (User, Actor) {
    let user = User::create(
        pool,
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

    let actor = Actor::member(user.id, user.role);
    (user, actor)
}
