/// Authorization policy
///
/// Every role check in the portal goes through [`authorize`]. The policy is a
/// pure function of the current [`Actor`] and the requested [`Action`]; it
/// never touches the database. Callers reload the actor from the store on
/// every request, so role changes and deactivation apply immediately.
///
/// # Policy
///
/// | Action                               | admin | researcher | doctor | patient |
/// |--------------------------------------|-------|------------|--------|---------|
/// | view papers, datasets, news          | yes   | yes        | yes    | yes     |
/// | publish paper or news                | yes   | yes        | yes    | yes     |
/// | download paper                       | yes   | yes        | yes    | yes     |
/// | publish/download members dataset     | yes   | yes        | yes    | yes     |
/// | publish/download researchers dataset | yes   | yes        | no     | no      |
/// | researcher and doctor directories    | yes   | yes        | yes    | yes     |
/// | patient directory                    | yes   | yes        | no     | self    |
/// | `general` channel                    | yes   | yes        | yes    | yes     |
/// | `research` channel                   | yes   | yes        | yes    | no      |
/// | `patients` channel                   | yes   | no         | no     | yes     |
/// | manage users                         | yes   | no         | no     | no      |
///
/// Anonymous actors are denied everything with [`AuthzError::LoginRequired`].
/// Denied writes are [`AuthzError::Unauthorized`], denied reads are
/// [`AuthzError::Forbidden`].
///
/// # Example
///
/// ```
/// use conatoc_shared::auth::authorization::{authorize, Action, Actor, AuthzError};
/// use conatoc_shared::models::dataset::Visibility;
/// use conatoc_shared::models::user::Role;
///
/// let doctor = Actor::member(5, Role::Doctor);
/// assert!(authorize(&doctor, Action::DownloadDataset(Visibility::Members)).is_ok());
/// assert!(matches!(
///     authorize(&doctor, Action::DownloadDataset(Visibility::Researchers)),
///     Err(AuthzError::Forbidden(_))
/// ));
/// ```

use serde::Serialize;

use crate::models::chat_message::Channel;
use crate::models::dataset::Visibility;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No signed-in actor
    #[error("Please log in")]
    LoginRequired,

    /// Role does not permit a write or administrative action
    #[error("Not authorized to {0}")]
    Unauthorized(String),

    /// Role does not permit reading a resource
    #[error("Not allowed to {0}")]
    Forbidden(String),
}

/// The member performing a request, or nobody
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Actor {
    /// No valid session
    Anonymous,

    /// An active, signed-in member
    Member { id: i64, role: Role },
}

impl Actor {
    /// Creates a signed-in actor
    pub fn member(id: i64, role: Role) -> Self {
        Actor::Member { id, role }
    }

    /// Member id, if signed in
    pub fn id(&self) -> Option<i64> {
        match self {
            Actor::Anonymous => None,
            Actor::Member { id, .. } => Some(*id),
        }
    }

    /// Role, if signed in
    pub fn role(&self) -> Option<Role> {
        match self {
            Actor::Anonymous => None,
            Actor::Member { role, .. } => Some(*role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Member { .. })
    }

    /// Returns `(id, role)` or `LoginRequired`
    pub fn require_member(&self) -> Result<(i64, Role), AuthzError> {
        match self {
            Actor::Anonymous => Err(AuthzError::LoginRequired),
            Actor::Member { id, role } => Ok((*id, *role)),
        }
    }
}

/// Member directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Directory {
    /// Researchers and admins
    Researchers,

    /// Doctors
    Doctors,

    /// Patients
    Patients,
}

/// Something an actor wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewPapers,
    PublishPaper,
    DownloadPaper,
    ViewDatasets,
    PublishDataset(Visibility),
    DownloadDataset(Visibility),
    ViewNews,
    PublishNews,
    ViewDirectory(Directory),
    ReadChannel(Channel),
    PostChannel(Channel),
    ListUsers,
    SetRole,
    DeactivateUser,
}

impl Action {
    /// Whether the action changes state (denials are `Unauthorized`)
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Action::PublishPaper
                | Action::PublishDataset(_)
                | Action::PublishNews
                | Action::PostChannel(_)
                | Action::ListUsers
                | Action::SetRole
                | Action::DeactivateUser
        )
    }

    /// Short human description used in denial messages
    pub fn describe(&self) -> String {
        match self {
            Action::ViewPapers => "view papers".to_string(),
            Action::PublishPaper => "publish papers".to_string(),
            Action::DownloadPaper => "download papers".to_string(),
            Action::ViewDatasets => "view datasets".to_string(),
            Action::PublishDataset(Visibility::Researchers) => {
                "post researcher-only datasets".to_string()
            }
            Action::PublishDataset(Visibility::Members) => "publish datasets".to_string(),
            Action::DownloadDataset(Visibility::Researchers) => {
                "download researcher-only datasets".to_string()
            }
            Action::DownloadDataset(Visibility::Members) => "download datasets".to_string(),
            Action::ViewNews => "view news".to_string(),
            Action::PublishNews => "post news".to_string(),
            Action::ViewDirectory(Directory::Researchers) => "view the researcher directory".to_string(),
            Action::ViewDirectory(Directory::Doctors) => "view the doctor directory".to_string(),
            Action::ViewDirectory(Directory::Patients) => "view the patient registry".to_string(),
            Action::ReadChannel(channel) => format!("read the {} channel", channel),
            Action::PostChannel(channel) => format!("post to the {} channel", channel),
            Action::ListUsers => "list users".to_string(),
            Action::SetRole => "change roles".to_string(),
            Action::DeactivateUser => "deactivate users".to_string(),
        }
    }
}

/// Whether a role may read and post in a chat channel
pub fn can_access_channel(role: Role, channel: Channel) -> bool {
    match channel {
        Channel::General => true,
        Channel::Research => matches!(role, Role::Admin | Role::Researcher | Role::Doctor),
        Channel::Patients => matches!(role, Role::Admin | Role::Patient),
    }
}

/// Whether a role may see researcher-only datasets' files and post them
pub fn is_research_staff(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Researcher)
}

fn role_permits(role: Role, action: Action) -> bool {
    match action {
        Action::ViewPapers
        | Action::PublishPaper
        | Action::DownloadPaper
        | Action::ViewDatasets
        | Action::ViewNews
        | Action::PublishNews
        | Action::PublishDataset(Visibility::Members)
        | Action::DownloadDataset(Visibility::Members)
        | Action::ViewDirectory(Directory::Researchers)
        | Action::ViewDirectory(Directory::Doctors) => true,

        Action::PublishDataset(Visibility::Researchers)
        | Action::DownloadDataset(Visibility::Researchers)
        | Action::ViewDirectory(Directory::Patients) => is_research_staff(role),

        Action::ReadChannel(channel) | Action::PostChannel(channel) => {
            can_access_channel(role, channel)
        }

        Action::ListUsers | Action::SetRole | Action::DeactivateUser => role == Role::Admin,
    }
}

/// Decides whether `actor` may perform `action`
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `Unauthorized` for a denied write
/// - `Forbidden` for a denied read
pub fn authorize(actor: &Actor, action: Action) -> Result<(), AuthzError> {
    let (_, role) = actor.require_member()?;

    if role_permits(role, action) {
        return Ok(());
    }

    if action.is_write() {
        Err(AuthzError::Unauthorized(action.describe()))
    } else {
        Err(AuthzError::Forbidden(action.describe()))
    }
}

/// Channels the actor may use, in display order
pub fn accessible_channels(actor: &Actor) -> Vec<Channel> {
    match actor.role() {
        None => Vec::new(),
        Some(role) => Channel::ALL
            .into_iter()
            .filter(|channel| can_access_channel(role, *channel))
            .collect(),
    }
}

/// How much of the patient registry an actor sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientRegistryAccess {
    /// Every patient record
    Full,

    /// Only the actor's own summary
    SelfOnly,
}

/// Resolves patient registry access
///
/// Patients are not shown the list but get their own summary instead of a
/// denial; doctors are denied.
pub fn patient_registry_access(actor: &Actor) -> Result<PatientRegistryAccess, AuthzError> {
    match authorize(actor, Action::ViewDirectory(Directory::Patients)) {
        Ok(()) => Ok(PatientRegistryAccess::Full),
        Err(AuthzError::Forbidden(_)) if actor.role() == Some(Role::Patient) => {
            Ok(PatientRegistryAccess::SelfOnly)
        }
        Err(err) => Err(err),
    }
}
