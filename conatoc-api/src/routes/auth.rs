/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register and sign in
/// - `POST /v1/auth/login` - Sign in and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
/// - `GET  /v1/me` - Current member's profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use conatoc_shared::{
    auth::{authorization::Actor, jwt},
    identity::{self, Registration},
    models::user::User,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
///
/// Blank or missing fields are reported by the core with the field name;
/// the limits here only bound what gets stored.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 120, message = "Name must be at most 120 characters"))]
    pub name: String,

    #[validate(length(max = 180, message = "Affiliation must be at most 180 characters"))]
    pub affiliation: Option<String>,

    #[serde(default)]
    #[validate(length(max = 256, message = "Password must be at most 256 characters"))]
    pub password: String,

    /// `patient` (default) or `researcher`
    pub role: Option<String>,

    /// Privacy and data-use consent; registration is refused without it
    #[serde(default)]
    pub consent: bool,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Signed-in session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn session(user: User, secret: &str) -> ApiResult<SessionResponse> {
    let (access_token, refresh_token) = jwt::issue_token_pair(user.id, secret)?;
    Ok(SessionResponse {
        user,
        access_token,
        refresh_token,
    })
}

/// Register a new member and sign them in
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "p1@x.org",
///   "name": "Pat",
///   "affiliation": "Guelph",
///   "password": "longpassword",
///   "role": "patient",
///   "consent": true
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing field, bad email, short password, no consent
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    req.validate()?;

    if !req.consent {
        return Err(ApiError::invalid(
            "consent",
            "Please accept the privacy and data-use terms",
        ));
    }

    let user = identity::register(
        &state.db,
        Registration {
            email: req.email,
            name: req.name,
            affiliation: req.affiliation,
            password: req.password,
            requested_role: req.role,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(session(user, state.jwt_secret())?)))
}

/// Login endpoint
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Email or password missing
/// - `401 Unauthorized`: Invalid credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = identity::authenticate(&state.db, &req.email, &req.password).await?;

    Ok(Json(session(user, state.jwt_secret())?))
}

/// Token refresh endpoint
///
/// The member must still exist and be active.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or deactivated member
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;
    let user_id = claims.user_id()?;

    let active = User::find_by_id(&state.db, user_id)
        .await?
        .is_some_and(|user| user.active);
    if !active {
        return Err(ApiError::Unauthorized("Session is no longer valid".to_string()));
    }

    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Current member's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<User>> {
    Ok(Json(identity::current_user(&state.db, &actor).await?))
}
