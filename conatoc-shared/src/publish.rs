/// Publish transaction for papers and datasets
///
/// Publishing runs in a fixed order:
///
/// 1. `LoginRequired` for anonymous actors
/// 2. `MissingField("title")` for a blank title
/// 3. Role check (researcher-only datasets need an admin or researcher)
/// 4. The staged file, if any, is taken from the staging area; the handle
///    cannot be used again
/// 5. Insert and refreshed listing run in one transaction; if it fails the
///    staged file is put back under its handle
///
/// A failed validation writes nothing and leaves the staged file in place.
/// The outcome carries the refreshed listing, newest first, which replaces
/// whatever listing the client was showing.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::authorization::{authorize, Action, Actor};
use crate::content::{optional_text, required_text};
use crate::error::{PortalError, PortalResult};
use crate::models::dataset::{self, CreateDataset, DatasetSummary, Visibility};
use crate::models::paper::{self, CreatePaper, PaperSummary};
use crate::staging::{StagedFile, StagingHandle, UploadKind, UploadStaging};

/// Paper form fields
#[derive(Debug, Clone, Default)]
pub struct PaperMetadata {
    pub title: String,
    pub link: Option<String>,
    pub tags: Option<String>,
    pub summary: Option<String>,
}

/// Dataset form fields
#[derive(Debug, Clone, Default)]
pub struct DatasetMetadata {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<String>,

    /// `members` or `researchers`; anything else publishes to members
    pub visibility: Option<String>,
}

/// Created record plus the authoritative listing after the publish
#[derive(Debug, Clone, Serialize)]
pub struct Published<T> {
    pub record: T,
    pub listing: Vec<T>,
}

fn take_staged(
    staging: &UploadStaging,
    actor: &Actor,
    kind: UploadKind,
    handle: Option<StagingHandle>,
) -> PortalResult<Option<(StagingHandle, StagedFile)>> {
    handle
        .map(|handle| staging.take(actor, kind, &handle).map(|file| (handle, file)))
        .transpose()
}

fn file_columns(staged: &Option<(StagingHandle, StagedFile)>) -> (Option<String>, Option<Vec<u8>>) {
    match staged {
        Some((_, file)) => (file.file_name.clone(), Some(file.bytes.to_vec())),
        None => (None, None),
    }
}

fn restore_on_failure(
    staging: &UploadStaging,
    owner: i64,
    kind: UploadKind,
    staged: Option<(StagingHandle, StagedFile)>,
    err: &sqlx::Error,
) {
    warn!(owner, %kind, error = %err, "Publish transaction failed");
    if let Some((handle, file)) = staged {
        staging.restore(owner, kind, handle, file);
    }
}

async fn insert_paper(
    pool: &SqlitePool,
    data: CreatePaper,
) -> Result<Published<PaperSummary>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let id = paper::insert(&mut *tx, data).await?;
    let record = paper::find_summary(&mut *tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let listing = paper::list(&mut *tx, None).await?;

    tx.commit().await?;

    Ok(Published { record, listing })
}

async fn insert_dataset(
    pool: &SqlitePool,
    data: CreateDataset,
) -> Result<Published<DatasetSummary>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let id = dataset::insert(&mut *tx, data).await?;
    let record = dataset::find_summary(&mut *tx, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let listing = dataset::list(&mut *tx).await?;

    tx.commit().await?;

    Ok(Published { record, listing })
}

/// Publishes a paper, attaching the staged file if a handle is given
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `MissingField("title")` for a blank title
/// - `NotFound` for an unusable staging handle
pub async fn publish_paper(
    pool: &SqlitePool,
    staging: &UploadStaging,
    actor: &Actor,
    metadata: PaperMetadata,
    handle: Option<StagingHandle>,
) -> PortalResult<Published<PaperSummary>> {
    let (owner, _) = actor.require_member()?;
    let title = required_text(&metadata.title, "title")?;
    authorize(actor, Action::PublishPaper)?;

    let staged = take_staged(staging, actor, UploadKind::Paper, handle)?;
    let (file_name, file_bytes) = file_columns(&staged);

    let data = CreatePaper {
        title,
        link: optional_text(metadata.link),
        tags: optional_text(metadata.tags),
        summary: optional_text(metadata.summary),
        file_name,
        file_bytes,
        uploaded_by: owner,
    };

    match insert_paper(pool, data).await {
        Ok(published) => {
            info!(
                paper_id = published.record.id,
                user_id = owner,
                has_file = published.record.has_file,
                "Paper published"
            );
            Ok(published)
        }
        Err(err) => {
            restore_on_failure(staging, owner, UploadKind::Paper, staged, &err);
            Err(PortalError::Database(err))
        }
    }
}

/// Publishes a dataset, attaching the staged file if a handle is given
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `MissingField("title")` for a blank title
/// - `Unauthorized` for a researcher-only dataset from a doctor or patient
/// - `NotFound` for an unusable staging handle
pub async fn publish_dataset(
    pool: &SqlitePool,
    staging: &UploadStaging,
    actor: &Actor,
    metadata: DatasetMetadata,
    handle: Option<StagingHandle>,
) -> PortalResult<Published<DatasetSummary>> {
    let (owner, _) = actor.require_member()?;
    let title = required_text(&metadata.title, "title")?;
    let visibility = Visibility::parse_or_members(metadata.visibility.as_deref());
    authorize(actor, Action::PublishDataset(visibility))?;

    let staged = take_staged(staging, actor, UploadKind::Dataset, handle)?;
    let (file_name, file_bytes) = file_columns(&staged);

    let data = CreateDataset {
        title,
        description: optional_text(metadata.description),
        link: optional_text(metadata.link),
        tags: optional_text(metadata.tags),
        visibility,
        file_name,
        file_bytes,
        uploaded_by: owner,
    };

    match insert_dataset(pool, data).await {
        Ok(published) => {
            info!(
                dataset_id = published.record.id,
                user_id = owner,
                visibility = %visibility,
                has_file = published.record.has_file,
                "Dataset published"
            );
            Ok(published)
        }
        Err(err) => {
            restore_on_failure(staging, owner, UploadKind::Dataset, staged, &err);
            Err(PortalError::Database(err))
        }
    }
}
