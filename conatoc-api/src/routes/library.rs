/// Paper and dataset library endpoints
///
/// - `GET  /v1/papers?q=&page=` / `GET /v1/datasets?q=&page=` - Filtered, paged listings
/// - `POST /v1/papers` / `POST /v1/datasets` - Publish, optionally attaching a staged upload
/// - `GET  /v1/papers/:id/download` / `GET /v1/datasets/:id/download` - File as an attachment
///
/// Publishing returns the created record and the refreshed listing so the
/// client never shows a stale library.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use conatoc_shared::{
    auth::authorization::Actor,
    content::{
        filter::{Page, LIBRARY_PAGE_SIZE},
        library::{self, DownloadedFile},
    },
    models::{dataset::DatasetSummary, paper::PaperSummary},
    publish::{self, DatasetMetadata, PaperMetadata, Published},
    staging::StagingHandle,
};
use serde::Deserialize;
use validator::Validate;

/// Listing query string
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring filter
    pub q: Option<String>,

    /// 1-based page number
    pub page: Option<usize>,
}

/// Paper publish form
#[derive(Debug, Deserialize, Validate)]
pub struct PublishPaperRequest {
    #[serde(default)]
    #[validate(length(max = 400, message = "Title must be at most 400 characters"))]
    pub title: String,
    #[validate(length(max = 800, message = "Link must be at most 800 characters"))]
    pub link: Option<String>,
    #[validate(length(max = 300, message = "Tags must be at most 300 characters"))]
    pub tags: Option<String>,
    pub summary: Option<String>,

    /// Handle from `POST /v1/uploads` with `kind = paper`
    pub staging_handle: Option<StagingHandle>,
}

/// Dataset publish form
#[derive(Debug, Deserialize, Validate)]
pub struct PublishDatasetRequest {
    #[serde(default)]
    #[validate(length(max = 400, message = "Title must be at most 400 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 800, message = "Link must be at most 800 characters"))]
    pub link: Option<String>,
    #[validate(length(max = 300, message = "Tags must be at most 300 characters"))]
    pub tags: Option<String>,

    /// `members` (default) or `researchers`
    pub visibility: Option<String>,

    /// Handle from `POST /v1/uploads` with `kind = dataset`
    pub staging_handle: Option<StagingHandle>,
}

pub async fn list_papers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<PaperSummary>>> {
    let rows = library::list_papers(&state.db, &actor, query.q.as_deref()).await?;
    Ok(Json(Page::paginate(rows, query.page.unwrap_or(1), LIBRARY_PAGE_SIZE)))
}

pub async fn list_datasets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<DatasetSummary>>> {
    let rows = library::list_datasets(&state.db, &actor, query.q.as_deref()).await?;
    Ok(Json(Page::paginate(rows, query.page.unwrap_or(1), LIBRARY_PAGE_SIZE)))
}

/// Publish a paper
///
/// # Errors
///
/// - `303 See Other`: Not signed in
/// - `422 Unprocessable Entity`: Blank title or a field over its length limit
/// - `404 Not Found`: Staging handle unknown, expired, used, or not the caller's
pub async fn publish_paper(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<PublishPaperRequest>,
) -> ApiResult<(StatusCode, Json<Published<PaperSummary>>)> {
    actor.require_member()?;
    req.validate()?;

    let metadata = PaperMetadata {
        title: req.title,
        link: req.link,
        tags: req.tags,
        summary: req.summary,
    };

    let published =
        publish::publish_paper(&state.db, &state.staging, &actor, metadata, req.staging_handle)
            .await?;

    Ok((StatusCode::CREATED, Json(published)))
}

/// Publish a dataset
///
/// # Errors
///
/// - `303 See Other`: Not signed in
/// - `422 Unprocessable Entity`: Blank title or a field over its length limit
/// - `403 Forbidden`: Researcher-only visibility requested by a doctor or patient
/// - `404 Not Found`: Staging handle unusable
pub async fn publish_dataset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<PublishDatasetRequest>,
) -> ApiResult<(StatusCode, Json<Published<DatasetSummary>>)> {
    actor.require_member()?;
    req.validate()?;

    let metadata = DatasetMetadata {
        title: req.title,
        description: req.description,
        link: req.link,
        tags: req.tags,
        visibility: req.visibility,
    };

    let published =
        publish::publish_dataset(&state.db, &state.staging, &actor, metadata, req.staging_handle)
            .await?;

    Ok((StatusCode::CREATED, Json(published)))
}

pub async fn download_paper(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    attachment(library::download_paper(&state.db, &actor, id).await?)
}

pub async fn download_dataset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    attachment(library::download_dataset(&state.db, &actor, id).await?)
}

/// Sends a file with `Content-Disposition: attachment`
fn attachment(file: DownloadedFile) -> ApiResult<Response> {
    let disposition = format!("attachment; filename=\"{}\"", header_safe_name(&file.file_name));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::InternalError(format!("Invalid file name header: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
        ],
        Body::from(file.bytes),
    )
        .into_response())
}

/// Keeps printable ASCII other than quotes and backslashes
fn header_safe_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if safe.trim().is_empty() {
        "download".to_string()
    } else {
        safe
    }
}
