/// Error handling for the portal server
///
/// Handlers return `ApiResult<T>`; every core error converts into an
/// [`ApiError`] and renders as a JSON `{error, message}` body with the
/// matching status code. Anonymous callers hitting a member-only route are
/// redirected to the login page.
///
/// # Example
///
/// ```ignore
/// use conatoc_api::error::ApiResult;
/// use axum::Json;
///
/// async fn handler() -> ApiResult<Json<Vec<NewsPost>>> {
///     let feed = list_news(&pool, &actor).await?;
///     Ok(Json(feed))
/// }
/// ```

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use conatoc_shared::auth::authorization::AuthzError;
use conatoc_shared::auth::jwt::JwtError;
use conatoc_shared::error::PortalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where anonymous callers are sent
pub const LOGIN_PATH: &str = "/login";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Not signed in (303 to the login page)
    LoginRequired,

    /// Bad credentials or session token (401)
    Unauthorized(String),

    /// Role does not permit the action (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Upload over the configured cap (413)
    PayloadTooLarge(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::LoginRequired => write!(f, "Login required"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::LoginRequired => return login_redirect(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg, None)
            }
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Request validation failed".to_string());
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    message,
                    Some(errors),
                )
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Something went wrong. Please try again".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// 303 to the login page, keeping the JSON body for API clients
fn login_redirect() -> Response {
    let body = Json(ErrorResponse {
        error: "login_required".to_string(),
        message: "Please log in".to_string(),
        details: None,
    });
    (StatusCode::SEE_OTHER, [(header::LOCATION, LOGIN_PATH)], body).into_response()
}

/// Convert core errors to API errors
impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        let message = err.to_string();
        match err {
            PortalError::MissingField(field) => ApiError::invalid(field, message),
            PortalError::InvalidEmail => ApiError::invalid("email", message),
            PortalError::WeakCredential { .. } => ApiError::invalid("password", message),
            PortalError::InvalidRole(_) => ApiError::invalid("role", message),
            PortalError::DuplicateEmail => ApiError::Conflict(message),
            PortalError::InvalidCredentials | PortalError::AccountDeactivated => {
                ApiError::Unauthorized(message)
            }
            PortalError::LoginRequired => ApiError::LoginRequired,
            PortalError::Unauthorized(_) | PortalError::Forbidden(_) => ApiError::Forbidden(message),
            PortalError::NotFound(_) => ApiError::NotFound(message),
            PortalError::SelfDeactivation => ApiError::BadRequest(message),
            PortalError::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(message),
            PortalError::Password(_) | PortalError::Database(_) => ApiError::InternalError(message),
        }
    }
}

/// Convert policy decisions to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        PortalError::from(err).into()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::InternalError(format!("Database error: {}", err))
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    ValidationErrorDetail::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    )
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

/// Convert session token errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Failed to create token: {}", msg))
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}
