/// Paper model and database operations
///
/// Papers are shared literature: a title, an optional link/tags/summary and an
/// optional uploaded file (typically a PDF) stored inline as a BLOB.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE papers (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     link TEXT,
///     tags TEXT,
///     summary TEXT,
///     file_name TEXT,
///     file_bytes BLOB,
///     uploaded_by INTEGER NOT NULL REFERENCES users (id),
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// Listing queries never select `file_bytes`; they report `has_file` instead
/// and join the uploader's display name.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Sqlite};

/// Listing row for a paper (file bytes excluded)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperSummary {
    /// Paper ID
    pub id: i64,

    /// Title
    pub title: String,

    /// External link
    pub link: Option<String>,

    /// Comma-separated tags
    pub tags: Option<String>,

    /// Free-text summary
    pub summary: Option<String>,

    /// Uploaded file name, if a file was attached
    pub file_name: Option<String>,

    /// Whether non-empty file bytes are stored
    pub has_file: bool,

    /// Uploader's user ID
    pub uploaded_by: i64,

    /// Uploader's display name
    pub uploader_name: Option<String>,

    /// When the paper was published
    pub created_at: DateTime<Utc>,
}

/// Stored file of a paper
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaperFile {
    /// Paper ID
    pub id: i64,

    /// Uploaded file name
    pub file_name: Option<String>,

    /// Raw bytes (None when no file was attached)
    pub file_bytes: Option<Vec<u8>>,
}

/// Input for creating a paper
#[derive(Debug, Clone)]
pub struct CreatePaper {
    pub title: String,
    pub link: Option<String>,
    pub tags: Option<String>,
    pub summary: Option<String>,
    pub file_name: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
    pub uploaded_by: i64,
}

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.link, p.tags, p.summary, p.file_name,
           (p.file_bytes IS NOT NULL AND length(p.file_bytes) > 0) AS has_file,
           p.uploaded_by, u.name AS uploader_name, p.created_at
    FROM papers p
    LEFT JOIN users u ON u.id = p.uploaded_by
"#;

/// Inserts a paper and returns its ID
pub async fn insert<'e, E>(executor: E, data: CreatePaper) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO papers (title, link, tags, summary, file_name, file_bytes, uploaded_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id
        "#,
    )
    .bind(data.title)
    .bind(data.link)
    .bind(data.tags)
    .bind(data.summary)
    .bind(data.file_name)
    .bind(data.file_bytes)
    .bind(data.uploaded_by)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

/// Finds the listing row of one paper
pub async fn find_summary<'e, E>(executor: E, id: i64) -> Result<Option<PaperSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PaperSummary>(&format!("{SUMMARY_SELECT} WHERE p.id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Lists papers newest first, optionally capped at `limit` rows
pub async fn list<'e, E>(executor: E, limit: Option<i64>) -> Result<Vec<PaperSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    // SQLite treats a negative LIMIT as "no limit"
    sqlx::query_as::<_, PaperSummary>(&format!(
        "{SUMMARY_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT ?1"
    ))
    .bind(limit.unwrap_or(-1))
    .fetch_all(executor)
    .await
}

/// Loads the stored file of a paper
pub async fn find_file<'e, E>(executor: E, id: i64) -> Result<Option<PaperFile>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PaperFile>("SELECT id, file_name, file_bytes FROM papers WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Counts all papers
pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM papers")
        .fetch_one(executor)
        .await
}
