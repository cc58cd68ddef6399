/// User model and database operations
///
/// Members of the portal. Accounts are created by self-registration or by the
/// admin bootstrap and are never hard-deleted; an admin deactivates them
/// instead.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     email TEXT NOT NULL UNIQUE COLLATE NOCASE,
///     name TEXT NOT NULL,
///     affiliation TEXT,
///     role TEXT NOT NULL DEFAULT 'patient',
///     password_hash TEXT NOT NULL,
///     active INTEGER NOT NULL DEFAULT 1,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use conatoc_shared::models::user::{CreateUser, Role, User};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "p1@x.org".to_string(),
///     name: "Pat".to_string(),
///     affiliation: None,
///     role: Role::Patient,
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "p1@x.org").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages members; sees and does everything
    Admin,

    /// Research member; sees researcher-only datasets and the patient registry
    Researcher,

    /// Clinician; joins the research channel
    Doctor,

    /// Patient or caregiver
    Patient,
}

impl Role {
    /// All roles, in display order
    pub const ALL: [Role; 4] = [Role::Admin, Role::Researcher, Role::Doctor, Role::Patient];

    /// Converts role to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Researcher => "researcher",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// Parses a stored role string (exact, lowercase)
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model representing a member account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// User ID
    pub id: i64,

    /// Email address, stored trimmed and lowercase
    pub email: String,

    /// Display name
    pub name: String,

    /// Optional institution or organisation
    pub affiliation: Option<String>,

    /// Portal role
    pub role: Role,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Deactivated accounts cannot log in and their tokens stop resolving
    pub active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Normalized email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Optional affiliation
    pub affiliation: Option<String>,

    /// Initial role
    pub role: Role,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,
}

const USER_COLUMNS: &str =
    "id, email, name, affiliation, role, password_hash, active, created_at";

impl User {
    /// Creates a new, active user
    ///
    /// # Errors
    ///
    /// Returns a database error carrying a unique violation if the email is
    /// already registered.
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, affiliation, role, password_hash, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.email)
        .bind(data.name)
        .bind(data.affiliation)
        .bind(data.role)
        .bind(data.password_hash)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Lists every user, newest first
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Lists users holding any of the given roles, newest first
    pub async fn list_by_roles(pool: &SqlitePool, roles: &[Role]) -> Result<Vec<Self>, sqlx::Error> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE role IN ("));
        let mut separated = query.separated(", ");
        for role in roles {
            separated.push_bind(*role);
        }
        query.push(") ORDER BY created_at DESC, id DESC");

        query.build_query_as::<User>().fetch_all(pool).await
    }

    /// Counts users holding any of the given roles
    pub async fn count_by_roles(pool: &SqlitePool, roles: &[Role]) -> Result<i64, sqlx::Error> {
        if roles.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE role IN (");
        let mut separated = query.separated(", ");
        for role in roles {
            separated.push_bind(*role);
        }
        query.push(")");

        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Sets a user's role
    ///
    /// Returns the updated user, or None if no user has that ID.
    pub async fn set_role(pool: &SqlitePool, id: i64, role: Role) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Sets a user's active flag
    ///
    /// Returns the updated user, or None if no user has that ID.
    pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET active = ?2 WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(pool)
        .await
    }
}
