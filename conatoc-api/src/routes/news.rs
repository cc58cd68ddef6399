/// News feed endpoints
///
/// - `GET  /v1/news` - Latest posts, newest first
/// - `POST /v1/news` - Post an update (any member)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use conatoc_shared::{
    auth::authorization::Actor,
    content::news::{self, NewsInput},
    models::news_post::NewsPost,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NewsRequest {
    #[serde(default)]
    #[validate(length(max = 240, message = "Title must be at most 240 characters"))]
    pub title: String,

    #[serde(default)]
    pub body: String,

    #[validate(length(max = 800, message = "Link must be at most 800 characters"))]
    pub link: Option<String>,
}

pub async fn list_news(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<NewsPost>>> {
    Ok(Json(news::list_news(&state.db, &actor).await?))
}

pub async fn publish_news(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewsRequest>,
) -> ApiResult<(StatusCode, Json<NewsPost>)> {
    actor.require_member()?;
    req.validate()?;

    let post = news::publish_news(
        &state.db,
        &actor,
        NewsInput {
            title: req.title,
            body: req.body,
            link: req.link,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}
