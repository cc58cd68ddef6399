/// Paper and dataset listings and file downloads

use bytes::Bytes;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::filter::{filter_rows, Searchable};
use crate::auth::authorization::{authorize, Action, Actor};
use crate::error::{PortalError, PortalResult};
use crate::models::dataset::{self, DatasetSummary};
use crate::models::paper::{self, PaperSummary};

/// MIME type served for paper files
pub const PAPER_MIME_TYPE: &str = "application/pdf";

/// MIME type served for dataset files
pub const DATASET_MIME_TYPE: &str = "application/octet-stream";

impl Searchable for PaperSummary {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.tags.as_deref().unwrap_or(""),
            self.uploader_name.as_deref().unwrap_or(""),
            self.link.as_deref().unwrap_or(""),
        ]
    }
}

impl Searchable for DatasetSummary {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.tags.as_deref().unwrap_or(""),
            self.uploader_name.as_deref().unwrap_or(""),
            self.link.as_deref().unwrap_or(""),
            self.visibility.as_str(),
        ]
    }
}

/// A file ready to be sent to the client
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Bytes,
    pub file_name: String,
    pub mime_type: &'static str,
}

/// Lists papers newest first, filtered by `query`
pub async fn list_papers(
    pool: &SqlitePool,
    actor: &Actor,
    query: Option<&str>,
) -> PortalResult<Vec<PaperSummary>> {
    authorize(actor, Action::ViewPapers)?;

    let rows = paper::list(pool, None).await?;
    Ok(filter_rows(rows, query))
}

/// Lists datasets newest first, filtered by `query`
///
/// Researcher-only datasets are listed to every member; only their files are
/// restricted.
pub async fn list_datasets(
    pool: &SqlitePool,
    actor: &Actor,
    query: Option<&str>,
) -> PortalResult<Vec<DatasetSummary>> {
    authorize(actor, Action::ViewDatasets)?;

    let rows = dataset::list(pool).await?;
    Ok(filter_rows(rows, query))
}

fn stored_bytes(bytes: Option<Vec<u8>>) -> Option<Bytes> {
    bytes.filter(|b| !b.is_empty()).map(Bytes::from)
}

fn file_name_or(name: Option<String>, fallback: String) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
}

/// Loads a paper's file
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `NotFound` if the paper is absent or has no stored file
pub async fn download_paper(
    pool: &SqlitePool,
    actor: &Actor,
    paper_id: i64,
) -> PortalResult<DownloadedFile> {
    authorize(actor, Action::DownloadPaper)?;

    let file = paper::find_file(pool, paper_id)
        .await?
        .ok_or(PortalError::NotFound("File"))?;
    let bytes = stored_bytes(file.file_bytes).ok_or(PortalError::NotFound("File"))?;

    info!(paper_id, size = bytes.len(), user_id = ?actor.id(), "Paper downloaded");

    Ok(DownloadedFile {
        bytes,
        file_name: file_name_or(file.file_name, format!("paper_{paper_id}.pdf")),
        mime_type: PAPER_MIME_TYPE,
    })
}

/// Loads a dataset's file
///
/// The visibility check runs after the lookup, since it depends on the
/// stored record.
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `NotFound` if the dataset is absent or has no stored file
/// - `Forbidden` for a researcher-only dataset and a doctor or patient actor
pub async fn download_dataset(
    pool: &SqlitePool,
    actor: &Actor,
    dataset_id: i64,
) -> PortalResult<DownloadedFile> {
    actor.require_member()?;

    let file = dataset::find_file(pool, dataset_id)
        .await?
        .ok_or(PortalError::NotFound("File"))?;

    if let Err(denied) = authorize(actor, Action::DownloadDataset(file.visibility)) {
        debug!(dataset_id, user_id = ?actor.id(), "Dataset download denied");
        return Err(denied.into());
    }

    let bytes = stored_bytes(file.file_bytes).ok_or(PortalError::NotFound("File"))?;

    info!(dataset_id, size = bytes.len(), user_id = ?actor.id(), "Dataset downloaded");

    Ok(DownloadedFile {
        bytes,
        file_name: file_name_or(file.file_name, format!("dataset_{dataset_id}.bin")),
        mime_type: DATASET_MIME_TYPE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_file_names() {
        assert_eq!(file_name_or(None, "paper_3.pdf".to_string()), "paper_3.pdf");
        assert_eq!(file_name_or(Some("  ".to_string()), "x".to_string()), "x");
        assert_eq!(file_name_or(Some("notes.pdf".to_string()), "x".to_string()), "notes.pdf");
    }

    #[test]
    fn test_empty_bytes_are_not_a_file() {
        assert!(stored_bytes(None).is_none());
        assert!(stored_bytes(Some(Vec::new())).is_none());
        assert_eq!(stored_bytes(Some(vec![1, 2])).map(|b| b.len()), Some(2));
    }
}
