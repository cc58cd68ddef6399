/// Landing page overview
///
/// Community counts are public. Signed-in members also get the latest papers
/// and news.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::auth::authorization::Actor;
use crate::error::PortalResult;
use crate::models::news_post::NewsPost;
use crate::models::paper::{self, PaperSummary};
use crate::models::user::{Role, User};

/// Papers shown on the overview
pub const OVERVIEW_PAPERS: i64 = 6;

/// News posts shown on the overview
pub const OVERVIEW_NEWS: i64 = 4;

/// Public counts plus, for members, the latest content
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Researchers, admins included
    pub researchers: i64,

    pub patients: i64,

    pub papers: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_papers: Option<Vec<PaperSummary>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_news: Option<Vec<NewsPost>>,
}

/// Builds the overview for any actor, anonymous included
pub async fn overview(pool: &SqlitePool, actor: &Actor) -> PortalResult<Overview> {
    let researchers = User::count_by_roles(pool, &[Role::Researcher, Role::Admin]).await?;
    let patients = User::count_by_roles(pool, &[Role::Patient]).await?;
    let papers = paper::count(pool).await?;

    let (latest_papers, latest_news) = if actor.is_authenticated() {
        (
            Some(paper::list(pool, Some(OVERVIEW_PAPERS)).await?),
            Some(NewsPost::list_latest(pool, OVERVIEW_NEWS).await?),
        )
    } else {
        (None, None)
    };

    Ok(Overview {
        researchers,
        patients,
        papers,
        latest_papers,
        latest_news,
    })
}
