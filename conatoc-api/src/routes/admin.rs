/// Admin endpoints
///
/// - `GET  /v1/admin/users` - All accounts, newest first
/// - `POST /v1/admin/users/:id/role` - Set role (`admin`, `researcher` or `patient`)
/// - `POST /v1/admin/users/:id/deactivate` - Deactivate an account
///
/// Every call is checked against the caller's current role; non-admins get
/// 403 whatever the target or requested role.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use conatoc_shared::{auth::authorization::Actor, identity, models::user::User};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub role: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(identity::list_users(&state.db, &actor).await?))
}

/// Set a member's role
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `422 Unprocessable Entity`: Role not assignable
/// - `404 Not Found`: No such user
pub async fn set_role(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(identity::set_role(&state.db, &actor, id, &req.role).await?))
}

/// Deactivate a member
///
/// # Errors
///
/// - `400 Bad Request`: Caller targeted their own account
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    Ok(Json(identity::deactivate(&state.db, &actor, id).await?))
}
