/// Integration tests for database migrations
///
/// Run with: cargo test --test db_migrations_tests

use conatoc_shared::db::migrations::{get_migration_status, run_migrations};
use conatoc_shared::db::pool::{close_pool, create_pool, DatabaseConfig};

#[tokio::test]
async fn test_run_migrations() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    let before = get_migration_status(&pool).await.expect("Failed to get status");
    assert_eq!(before.applied_migrations, 0);
    assert_eq!(before.latest_version, None);

    let result = run_migrations(&pool).await;
    assert!(result.is_ok(), "Migrations failed: {:?}", result.err());

    let status = get_migration_status(&pool).await.expect("Failed to get status");
    assert!(status.applied_migrations > 0, "No migrations were applied");
    assert_eq!(status.latest_version, Some(20250101000000));

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    run_migrations(&pool).await.expect("First run failed");
    let first = get_migration_status(&pool).await.unwrap();

    run_migrations(&pool).await.expect("Second run failed");
    let second = get_migration_status(&pool).await.unwrap();

    assert_eq!(first.applied_migrations, second.applied_migrations);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    for table in ["users", "papers", "datasets", "news_posts", "chat_messages"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("Failed to query sqlite_master");

        assert!(exists, "Table {} should exist", table);
    }

    close_pool(pool).await;
}

#[tokio::test]
async fn test_schema_rejects_unknown_roles_and_channels() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    let result = sqlx::query(
        "INSERT INTO users (email, name, role, password_hash, created_at) VALUES ('a@b.c', 'A', 'owner', 'x', '2025-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "Unknown role should violate the CHECK constraint");

    let result = sqlx::query(
        "INSERT INTO chat_messages (channel, message, created_by, created_at) VALUES ('random', 'hi', 1, '2025-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "Unknown channel should be rejected");

    close_pool(pool).await;
}
