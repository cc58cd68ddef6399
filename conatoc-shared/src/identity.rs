/// Identity store operations
///
/// Registration, login, admin role changes and deactivation, and the admin
/// bootstrap run at process start. All validation happens before any write.
///
/// # Example
///
/// ```no_run
/// use conatoc_shared::identity::{authenticate, register, Registration};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = register(&pool, Registration {
///     email: "P1@X.org ".to_string(),
///     name: "Pat".to_string(),
///     affiliation: None,
///     password: "longpassword".to_string(),
///     requested_role: Some("patient".to_string()),
/// }).await?;
/// assert_eq!(user.email, "p1@x.org");
///
/// let same = authenticate(&pool, "p1@x.org", "longpassword").await?;
/// assert_eq!(same.id, user.id);
/// # Ok(())
/// # }
/// ```

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::authorization::{authorize, Action, Actor};
use crate::auth::password::{
    hash_password, meets_minimum_length, verify_against_dummy, verify_password,
    MIN_PASSWORD_LENGTH,
};
use crate::content::{optional_text, required_text};
use crate::error::{PortalError, PortalResult};
use crate::models::user::{CreateUser, Role, User};

/// Self-registration input
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub affiliation: Option<String>,
    pub password: String,

    /// Only `patient` and `researcher` are honoured; anything else registers
    /// a patient
    pub requested_role: Option<String>,
}

/// Bootstrap admin account settings
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub name: String,
    pub affiliation: Option<String>,
}

/// Result of [`bootstrap_admin`]
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// The admin account was created
    Created(User),

    /// An account with the admin email already existed and was left as is
    Existing(User),
}

/// Normalizes an email address (trimmed, lowercase)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Role a self-registering member receives
pub fn registration_role(requested: Option<&str>) -> Role {
    match requested.map(str::trim) {
        Some("researcher") => Role::Researcher,
        _ => Role::Patient,
    }
}

/// Roles an admin may assign; `doctor` is not among them
pub fn assignable_role(value: &str) -> Option<Role> {
    match Role::parse(value.trim())? {
        Role::Doctor => None,
        role => Some(role),
    }
}

fn map_unique_violation(err: sqlx::Error) -> PortalError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return PortalError::DuplicateEmail;
        }
    }
    PortalError::Database(err)
}

/// Registers a new member
///
/// # Errors
///
/// - `MissingField` when name, email or password is blank
/// - `InvalidEmail` when the email has no `@`
/// - `WeakCredential` for passwords under the minimum length
/// - `DuplicateEmail` when the email is taken, in any letter case
pub async fn register(pool: &SqlitePool, input: Registration) -> PortalResult<User> {
    let name = required_text(&input.name, "name")?;
    let email = normalize_email(&required_text(&input.email, "email")?);
    if input.password.trim().is_empty() {
        return Err(PortalError::MissingField("password"));
    }

    if !email.contains('@') {
        return Err(PortalError::InvalidEmail);
    }

    if !meets_minimum_length(&input.password) {
        return Err(PortalError::WeakCredential {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if User::find_by_email(pool, &email).await?.is_some() {
        return Err(PortalError::DuplicateEmail);
    }

    let role = registration_role(input.requested_role.as_deref());
    let password_hash = hash_password(&input.password)?;

    let user = User::create(
        pool,
        CreateUser {
            email,
            name,
            affiliation: optional_text(input.affiliation),
            role,
            password_hash,
        },
    )
    .await
    .map_err(map_unique_violation)?;

    info!(user_id = user.id, role = %user.role, "Member registered");
    Ok(user)
}

/// Verifies credentials and returns the member
///
/// Unknown emails and wrong passwords fail identically.
///
/// # Errors
///
/// - `MissingField` when email or password is blank
/// - `InvalidCredentials` for an unknown email or wrong password
/// - `AccountDeactivated` when the password is right but the account is off
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> PortalResult<User> {
    let email = normalize_email(&required_text(email, "email")?);
    if password.trim().is_empty() {
        return Err(PortalError::MissingField("password"));
    }

    let Some(user) = User::find_by_email(pool, &email).await? else {
        verify_against_dummy(password);
        return Err(PortalError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "Failed login attempt");
        return Err(PortalError::InvalidCredentials);
    }

    if !user.active {
        warn!(user_id = user.id, "Login attempt on deactivated account");
        return Err(PortalError::AccountDeactivated);
    }

    info!(user_id = user.id, "Member logged in");
    Ok(user)
}

/// Changes a member's role
///
/// # Errors
///
/// - `Unauthorized` unless the actor is an admin (checked first)
/// - `InvalidRole` for anything but `admin`, `researcher` or `patient`
/// - `NotFound` when the target does not exist
pub async fn set_role(
    pool: &SqlitePool,
    actor: &Actor,
    target_user_id: i64,
    new_role: &str,
) -> PortalResult<User> {
    authorize(actor, Action::SetRole)?;

    let role = assignable_role(new_role).ok_or_else(|| PortalError::InvalidRole(new_role.to_string()))?;

    let user = User::set_role(pool, target_user_id, role)
        .await?
        .ok_or(PortalError::NotFound("User"))?;

    info!(
        admin_id = ?actor.id(),
        user_id = user.id,
        role = %user.role,
        "Role updated"
    );
    Ok(user)
}

/// Deactivates a member
///
/// # Errors
///
/// - `SelfDeactivation` when the target is the actor (checked first)
/// - `Unauthorized` unless the actor is an admin
/// - `NotFound` when the target does not exist
pub async fn deactivate(pool: &SqlitePool, actor: &Actor, target_user_id: i64) -> PortalResult<User> {
    if actor.id() == Some(target_user_id) {
        return Err(PortalError::SelfDeactivation);
    }

    authorize(actor, Action::DeactivateUser)?;

    let user = User::set_active(pool, target_user_id, false)
        .await?
        .ok_or(PortalError::NotFound("User"))?;

    info!(admin_id = ?actor.id(), user_id = user.id, "Member deactivated");
    Ok(user)
}

/// Every member, newest first (admin only)
pub async fn list_users(pool: &SqlitePool, actor: &Actor) -> PortalResult<Vec<User>> {
    authorize(actor, Action::ListUsers)?;

    Ok(User::list(pool).await?)
}

/// Profile of the signed-in member
pub async fn current_user(pool: &SqlitePool, actor: &Actor) -> PortalResult<User> {
    let (user_id, _) = actor.require_member()?;

    User::find_by_id(pool, user_id)
        .await?
        .ok_or(PortalError::NotFound("User"))
}

/// Creates the admin account if no account uses the admin email
///
/// Idempotent: an existing account is left untouched, whatever its role.
pub async fn bootstrap_admin(pool: &SqlitePool, admin: &AdminBootstrap) -> PortalResult<BootstrapOutcome> {
    let email = normalize_email(&admin.email);
    if !email.contains('@') {
        return Err(PortalError::InvalidEmail);
    }

    if let Some(existing) = User::find_by_email(pool, &email).await? {
        if existing.role != Role::Admin {
            warn!(user_id = existing.id, role = %existing.role, "Bootstrap admin email belongs to a non-admin account");
        }
        return Ok(BootstrapOutcome::Existing(existing));
    }

    if !meets_minimum_length(&admin.password) {
        warn!("Bootstrap admin password is shorter than {} characters", MIN_PASSWORD_LENGTH);
    }

    let user = User::create(
        pool,
        CreateUser {
            email,
            name: required_text(&admin.name, "name")?,
            affiliation: optional_text(admin.affiliation.clone()),
            role: Role::Admin,
            password_hash: hash_password(&admin.password)?,
        },
    )
    .await?;

    info!(user_id = user.id, email = %user.email, "Bootstrap admin created");
    Ok(BootstrapOutcome::Created(user))
}
