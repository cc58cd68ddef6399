/// Actor resolution middleware for Axum
///
/// Resolves the current [`Actor`] from the `Authorization: Bearer <token>`
/// header and adds it to the request extensions. The member is reloaded from
/// the database on every request, so the actor always carries the current
/// role and a deactivated member's token stops working at once.
///
/// Unlike a guard, this middleware never rejects a request for lacking
/// credentials: missing, malformed, expired or stale tokens all resolve to
/// [`Actor::Anonymous`] and the policy decides what an anonymous caller may
/// do. Only a database failure aborts the request.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware, Extension};
/// use conatoc_shared::auth::authorization::Actor;
/// use conatoc_shared::auth::middleware::create_actor_middleware;
/// use sqlx::SqlitePool;
/// use std::sync::Arc;
///
/// async fn handler(Extension(actor): Extension<Actor>) -> String {
///     format!("{:?}", actor)
/// }
///
/// fn app(pool: SqlitePool) -> Router {
///     Router::new()
///         .route("/whoami", get(handler))
///         .layer(middleware::from_fn(create_actor_middleware(pool, Arc::from("secret"))))
/// }
/// ```

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

use super::authorization::Actor;
use super::jwt::validate_access_token;
use crate::models::user::User;

/// Error type for actor resolution
#[derive(Debug)]
pub enum AuthError {
    /// Database error while reloading the member
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves an actor from an optional access token
///
/// Returns `Anonymous` when there is no token, the token does not validate,
/// the member no longer exists, or the member is deactivated.
pub async fn resolve_actor(
    pool: &SqlitePool,
    secret: &str,
    token: Option<&str>,
) -> Result<Actor, AuthError> {
    let Some(token) = token else {
        return Ok(Actor::Anonymous);
    };

    let user_id = match validate_access_token(token, secret).and_then(|claims| claims.user_id()) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            return Ok(Actor::Anonymous);
        }
    };

    let user = User::find_by_id(pool, user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Database error: {}", e)))?;

    match user {
        Some(user) if user.active => Ok(Actor::member(user.id, user.role)),
        Some(_) => {
            tracing::debug!(user_id, "Session token belongs to a deactivated member");
            Ok(Actor::Anonymous)
        }
        None => Ok(Actor::Anonymous),
    }
}

/// Actor resolution middleware
///
/// Adds an [`Actor`] extension to every request.
pub async fn actor_middleware(
    pool: SqlitePool,
    secret: Arc<str>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let actor = resolve_actor(&pool, &secret, bearer_token(req.headers())).await?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Creates an actor resolution middleware closure
///
/// Captures the pool and signing secret for use with
/// `axum::middleware::from_fn`.
pub fn create_actor_middleware(
    pool: SqlitePool,
    secret: Arc<str>,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let pool = pool.clone();
        let secret = secret.clone();
        Box::pin(actor_middleware(pool, secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::DatabaseError("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
