/// Dataset model and database operations
///
/// Same shape as a paper, with `description` in place of `summary` and a
/// visibility level that gates who may download the attached file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};

/// Who may download a dataset's file
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Any signed-in member
    #[default]
    Members,

    /// Admins and researchers only
    Researchers,
}

impl Visibility {
    /// Converts visibility to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Members => "members",
            Visibility::Researchers => "researchers",
        }
    }

    /// Parses a requested visibility, coercing anything unknown to `Members`
    pub fn parse_or_members(value: Option<&str>) -> Visibility {
        match value.map(str::trim) {
            Some("researchers") => Visibility::Researchers,
            _ => Visibility::Members,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing row for a dataset (file bytes excluded)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DatasetSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<String>,
    pub visibility: Visibility,
    pub file_name: Option<String>,
    pub has_file: bool,
    pub uploaded_by: i64,
    pub uploader_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored file of a dataset, with the visibility needed to authorize it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatasetFile {
    pub id: i64,
    pub visibility: Visibility,
    pub file_name: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
}

/// Input for creating a dataset
#[derive(Debug, Clone)]
pub struct CreateDataset {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<String>,
    pub visibility: Visibility,
    pub file_name: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
    pub uploaded_by: i64,
}

const SUMMARY_SELECT: &str = r#"
    SELECT d.id, d.title, d.description, d.link, d.tags, d.visibility, d.file_name,
           (d.file_bytes IS NOT NULL AND length(d.file_bytes) > 0) AS has_file,
           d.uploaded_by, u.name AS uploader_name, d.created_at
    FROM datasets d
    LEFT JOIN users u ON u.id = d.uploaded_by
"#;

/// Inserts a dataset and returns its ID
pub async fn insert<'e, E>(executor: E, data: CreateDataset) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO datasets
            (title, description, link, tags, visibility, file_name, file_bytes, uploaded_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING id
        "#,
    )
    .bind(data.title)
    .bind(data.description)
    .bind(data.link)
    .bind(data.tags)
    .bind(data.visibility)
    .bind(data.file_name)
    .bind(data.file_bytes)
    .bind(data.uploaded_by)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

/// Finds the listing row of one dataset
pub async fn find_summary<'e, E>(executor: E, id: i64) -> Result<Option<DatasetSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, DatasetSummary>(&format!("{SUMMARY_SELECT} WHERE d.id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Lists every dataset newest first
///
/// Researcher-only datasets are listed to all members; only their files are
/// restricted.
pub async fn list<'e, E>(executor: E) -> Result<Vec<DatasetSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, DatasetSummary>(&format!(
        "{SUMMARY_SELECT} ORDER BY d.created_at DESC, d.id DESC"
    ))
    .fetch_all(executor)
    .await
}

/// Loads the stored file of a dataset
pub async fn find_file<'e, E>(executor: E, id: i64) -> Result<Option<DatasetFile>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, DatasetFile>(
        "SELECT id, visibility, file_name, file_bytes FROM datasets WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}
