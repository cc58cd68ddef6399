/// Member directory endpoints
///
/// - `GET /v1/directory/researchers?q=&page=` - Researchers and admins
/// - `GET /v1/directory/doctors?q=&page=`
/// - `GET /v1/directory/patients?q=&page=` - Full registry for research
///   staff, the caller's own entry for patients, 403 for doctors

use crate::{app::AppState, error::ApiResult, routes::library::ListQuery};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use conatoc_shared::{
    auth::authorization::Actor,
    content::{
        directory::{self, MemberEntry, PatientEntry, PatientRegistry},
        filter::{Page, DIRECTORY_PAGE_SIZE},
    },
};
use serde::Serialize;

/// Patient registry response; only the full registry is paged
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PatientRegistryPage {
    Full { patients: Page<PatientEntry> },
    SelfSummary { profile: PatientEntry },
}

pub async fn researchers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<MemberEntry>>> {
    let rows = directory::researchers(&state.db, &actor, query.q.as_deref()).await?;
    Ok(Json(Page::paginate(rows, query.page.unwrap_or(1), DIRECTORY_PAGE_SIZE)))
}

pub async fn doctors(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<MemberEntry>>> {
    let rows = directory::doctors(&state.db, &actor, query.q.as_deref()).await?;
    Ok(Json(Page::paginate(rows, query.page.unwrap_or(1), DIRECTORY_PAGE_SIZE)))
}

pub async fn patients(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PatientRegistryPage>> {
    let registry = match directory::patients(&state.db, &actor, query.q.as_deref()).await? {
        PatientRegistry::Full { patients } => PatientRegistryPage::Full {
            patients: Page::paginate(patients, query.page.unwrap_or(1), DIRECTORY_PAGE_SIZE),
        },
        PatientRegistry::SelfSummary { profile } => PatientRegistryPage::SelfSummary { profile },
    };

    Ok(Json(registry))
}
