/// News feed

use sqlx::SqlitePool;
use tracing::info;

use super::{optional_text, required_text};
use crate::auth::authorization::{authorize, Action, Actor};
use crate::error::PortalResult;
use crate::models::news_post::{CreateNewsPost, NewsPost};

/// Number of posts returned by [`list_news`]
pub const NEWS_FEED_LIMIT: i64 = 10;

/// Fields of a new post
#[derive(Debug, Clone, Default)]
pub struct NewsInput {
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Posts to the news feed
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `MissingField` when the title or body is blank
pub async fn publish_news(pool: &SqlitePool, actor: &Actor, input: NewsInput) -> PortalResult<NewsPost> {
    authorize(actor, Action::PublishNews)?;
    let (user_id, _) = actor.require_member()?;

    let title = required_text(&input.title, "title")?;
    let body = required_text(&input.body, "body")?;

    let post = NewsPost::create(
        pool,
        CreateNewsPost {
            title,
            body,
            link: optional_text(input.link),
            created_by: user_id,
        },
    )
    .await?;

    info!(post_id = post.id, user_id, "News posted");
    Ok(post)
}

/// Latest posts, newest first
pub async fn list_news(pool: &SqlitePool, actor: &Actor) -> PortalResult<Vec<NewsPost>> {
    authorize(actor, Action::ViewNews)?;

    Ok(NewsPost::list_latest(pool, NEWS_FEED_LIMIT).await?)
}
