/// Member directories
///
/// Researchers (researchers and admins) and doctors are visible to every
/// member. The patient registry is visible in full to admins and
/// researchers; a patient sees only their own summary; doctors are denied.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::filter::{filter_rows, Searchable};
use crate::auth::authorization::{
    authorize, patient_registry_access, Action, Actor, Directory, PatientRegistryAccess,
};
use crate::error::{PortalError, PortalResult};
use crate::models::user::{Role, User};

/// Directory row for researchers, admins and doctors
#[derive(Debug, Clone, Serialize)]
pub struct MemberEntry {
    pub name: String,
    pub email: String,
    pub affiliation: Option<String>,
    pub role: Role,
    pub joined: DateTime<Utc>,
}

impl From<User> for MemberEntry {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            affiliation: user.affiliation,
            role: user.role,
            joined: user.created_at,
        }
    }
}

impl Searchable for MemberEntry {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.email.as_str(),
            self.affiliation.as_deref().unwrap_or(""),
            self.role.as_str(),
        ]
    }
}

/// Patient registry row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientEntry {
    pub name: String,
    pub email: String,
    pub affiliation: Option<String>,
    pub joined: DateTime<Utc>,
}

impl From<User> for PatientEntry {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            affiliation: user.affiliation,
            joined: user.created_at,
        }
    }
}

impl Searchable for PatientEntry {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

/// What the patient registry shows to the current actor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PatientRegistry {
    /// Every patient (admins and researchers)
    Full { patients: Vec<PatientEntry> },

    /// The patient's own record; patient lists are never shown to patients
    SelfSummary { profile: PatientEntry },
}

async fn list_members(
    pool: &SqlitePool,
    actor: &Actor,
    directory: Directory,
    roles: &[Role],
    query: Option<&str>,
) -> PortalResult<Vec<MemberEntry>> {
    authorize(actor, Action::ViewDirectory(directory))?;

    let rows = User::list_by_roles(pool, roles)
        .await?
        .into_iter()
        .map(MemberEntry::from)
        .collect();

    Ok(filter_rows(rows, query))
}

/// Researchers and admins, newest first
pub async fn researchers(
    pool: &SqlitePool,
    actor: &Actor,
    query: Option<&str>,
) -> PortalResult<Vec<MemberEntry>> {
    list_members(pool, actor, Directory::Researchers, &[Role::Researcher, Role::Admin], query).await
}

/// Doctors, newest first
pub async fn doctors(
    pool: &SqlitePool,
    actor: &Actor,
    query: Option<&str>,
) -> PortalResult<Vec<MemberEntry>> {
    list_members(pool, actor, Directory::Doctors, &[Role::Doctor], query).await
}

/// The patient registry as the actor may see it
///
/// The query filters the full registry; it is ignored for a self-summary.
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `Forbidden` for doctors
pub async fn patients(
    pool: &SqlitePool,
    actor: &Actor,
    query: Option<&str>,
) -> PortalResult<PatientRegistry> {
    match patient_registry_access(actor)? {
        PatientRegistryAccess::Full => {
            let rows = User::list_by_roles(pool, &[Role::Patient])
                .await?
                .into_iter()
                .map(PatientEntry::from)
                .collect();

            Ok(PatientRegistry::Full {
                patients: filter_rows(rows, query),
            })
        }
        PatientRegistryAccess::SelfOnly => {
            let (user_id, _) = actor.require_member()?;
            let user = User::find_by_id(pool, user_id)
                .await?
                .ok_or(PortalError::NotFound("User"))?;

            Ok(PatientRegistry::SelfSummary {
                profile: PatientEntry::from(user),
            })
        }
    }
}
