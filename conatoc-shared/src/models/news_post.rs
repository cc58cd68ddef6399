/// News feed posts

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// A news post joined with its author's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NewsPost {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub created_by: i64,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a news post
#[derive(Debug, Clone)]
pub struct CreateNewsPost {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub created_by: i64,
}

const POST_SELECT: &str = r#"
    SELECT n.id, n.title, n.body, n.link, n.created_by, u.name AS author_name, n.created_at
    FROM news_posts n
    LEFT JOIN users u ON u.id = n.created_by
"#;

impl NewsPost {
    /// Inserts a post and returns it with the author's name
    pub async fn create(pool: &SqlitePool, data: CreateNewsPost) -> Result<Self, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO news_posts (title, body, link, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(data.title)
        .bind(data.body)
        .bind(data.link)
        .bind(data.created_by)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        sqlx::query_as::<_, NewsPost>(&format!("{POST_SELECT} WHERE n.id = ?1"))
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Lists the latest posts, newest first
    pub async fn list_latest(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NewsPost>(&format!(
            "{POST_SELECT} ORDER BY n.created_at DESC, n.id DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
