/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: Session token generation and validation
/// - [`authorization`]: The role policy table and the [`authorization::Actor`]
/// - [`middleware`]: Resolves the current actor for every HTTP request
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Session Tokens**: HS256 signing, member id only; role is never trusted
///   from the token
/// - **Constant-time Comparison**: Password verification, including a dummy
///   verification for unknown emails
///
/// # Example
///
/// ```no_run
/// use conatoc_shared::auth::password::{hash_password, verify_password};
/// use conatoc_shared::auth::jwt::issue_token_pair;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (access, refresh) = issue_token_pair(1, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
