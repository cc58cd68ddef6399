/// Upload staging endpoint
///
/// ```text
/// POST /v1/uploads
/// Content-Type: application/json
///
/// { "kind": "paper", "file_name": "notes.pdf", "content": "JVBERi0x..." }
/// ```
///
/// `content` is base64, either bare or as a `data:` URL. The response's
/// `staging_handle` is passed to the matching publish call; it works once,
/// for the same member and kind, until it expires.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use conatoc_shared::{
    auth::authorization::Actor,
    staging::{StagingHandle, UploadKind},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upload request
#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    /// `paper` or `dataset`
    pub kind: UploadKind,

    /// Original file name, used for the download
    #[validate(length(max = 255, message = "File name must be at most 255 characters"))]
    pub file_name: Option<String>,

    /// Base64 or `data:` URL
    pub content: String,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub staging_handle: StagingHandle,
    pub kind: UploadKind,
    pub size: usize,
}

/// Stage a file for the caller's next publish of `kind`
///
/// # Errors
///
/// - `303 See Other`: Not signed in
/// - `422 Unprocessable Entity`: Content is not base64, or file name too long
/// - `413 Payload Too Large`: File over the upload cap
pub async fn stage_upload(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<UploadRequest>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    actor.require_member()?;
    req.validate()?;

    let bytes = decode_content(&req.content)?;
    let size = bytes.len();
    let file_name = req.file_name.unwrap_or_default();

    let staging_handle = state.staging.stage(&actor, req.kind, bytes, &file_name)?;

    tracing::debug!(kind = %req.kind, size, "Upload staged");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            staging_handle,
            kind: req.kind,
            size,
        }),
    ))
}

/// Decodes bare base64 or a base64 `data:` URL
fn decode_content(content: &str) -> ApiResult<Bytes> {
    let payload = match content.trim().strip_prefix("data:") {
        Some(url) => {
            let (meta, data) = url
                .split_once(',')
                .ok_or_else(|| ApiError::invalid("content", "Malformed data URL"))?;
            if !meta.ends_with(";base64") {
                return Err(ApiError::invalid("content", "Data URL must be base64-encoded"));
            }
            data
        }
        None => content.trim(),
    };

    if payload.is_empty() {
        return Err(ApiError::invalid("content", "Missing required field: content"));
    }

    STANDARD
        .decode(payload)
        .map(Bytes::from)
        .map_err(|_| ApiError::invalid("content", "File content is not valid base64"))
}
