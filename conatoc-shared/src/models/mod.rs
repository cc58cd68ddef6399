/// Database models for the portal
///
/// Each model owns its SQL. Operations take a `&SqlitePool`, or any SQLite
/// executor where the publish transaction needs to run them inside a
/// `Transaction`.
///
/// # Models
///
/// - `user`: Member accounts, roles and the active flag
/// - `paper`: Shared literature with optional PDF
/// - `dataset`: Shared data with optional file and a visibility level
/// - `news_post`: News feed
/// - `chat_message`: Channel chat
///
/// # Example
///
/// ```no_run
/// use conatoc_shared::models::user::{User, Role};
/// use conatoc_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let researchers = User::list_by_roles(&pool, &[Role::Researcher, Role::Admin]).await?;
/// # Ok(())
/// # }
/// ```

pub mod chat_message;
pub mod dataset;
pub mod news_post;
pub mod paper;
pub mod user;
