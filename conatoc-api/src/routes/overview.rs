/// Portal overview
///
/// ```text
/// GET /v1/overview
/// ```
///
/// Member counts and the paper total are public; the latest papers and news
/// are included only for signed-in members.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use conatoc_shared::{
    auth::authorization::Actor,
    content::overview::{self, Overview},
};

pub async fn overview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Overview>> {
    Ok(Json(overview::overview(&state.db, &actor).await?))
}
