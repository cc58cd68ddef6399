/// Error kinds surfaced by the portal core
///
/// Every operation in this crate returns [`PortalResult`]. The variants map
/// one-to-one onto user-visible messages; none of them is fatal to the
/// process. Infrastructure faults (database, hashing) are wrapped so the
/// session layer can log them and show a generic message instead.
///
/// # Example
///
/// ```
/// use conatoc_shared::error::PortalError;
///
/// let err = PortalError::MissingField("title");
/// assert_eq!(err.to_string(), "Missing required field: title");
/// ```

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;

/// Result alias used throughout the core
pub type PortalResult<T> = Result<T, PortalError>;

/// Error type for core portal operations
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// A required field was absent or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Email address has no `@`
    #[error("Please enter a valid email")]
    InvalidEmail,

    /// Password shorter than the minimum length
    #[error("Use a stronger password ({min}+ characters)")]
    WeakCredential { min: usize },

    /// Email already registered
    #[error("This email is already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password (never distinguished)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials verified but the account was deactivated by an admin
    #[error("Account is deactivated. Contact the administrator")]
    AccountDeactivated,

    /// No signed-in actor; the caller should be sent to the login page
    #[error("Please log in")]
    LoginRequired,

    /// Actor's role does not permit this write or administrative action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Actor's role does not permit reading this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Record absent (or holds no file for a download)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Role string not accepted for the requested operation
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// An admin tried to deactivate their own account
    #[error("You can't deactivate your own account")]
    SelfDeactivation,

    /// Upload exceeds the configured payload cap
    #[error("Upload too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Password hashing or verification failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PortalError {
    /// Whether this error is a validation/authorization decision rather than
    /// an infrastructure fault
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, PortalError::Password(_) | PortalError::Database(_))
    }
}

impl From<AuthzError> for PortalError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::LoginRequired => PortalError::LoginRequired,
            AuthzError::Unauthorized(action) => PortalError::Unauthorized(action),
            AuthzError::Forbidden(action) => PortalError::Forbidden(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PortalError::MissingField("email").to_string(),
            "Missing required field: email"
        );
        assert_eq!(
            PortalError::WeakCredential { min: 8 }.to_string(),
            "Use a stronger password (8+ characters)"
        );
        assert_eq!(PortalError::NotFound("Dataset").to_string(), "Dataset not found");
    }

    #[test]
    fn test_authz_error_conversion() {
        let err: PortalError = AuthzError::LoginRequired.into();
        assert!(matches!(err, PortalError::LoginRequired));

        let err: PortalError = AuthzError::Forbidden("download dataset".to_string()).into();
        assert!(matches!(err, PortalError::Forbidden(ref a) if a == "download dataset"));
    }

    #[test]
    fn test_user_facing() {
        assert!(PortalError::InvalidCredentials.is_user_facing());
        assert!(!PortalError::Database(sqlx::Error::RowNotFound).is_user_facing());
    }
}
