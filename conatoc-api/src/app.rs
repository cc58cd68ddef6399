/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use conatoc_api::{app::{build_router, AppState}, config::Config};
/// use conatoc_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::create_security_headers_middleware};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use conatoc_shared::auth::middleware::create_actor_middleware;
use conatoc_shared::staging::UploadStaging;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Uploads waiting for their publish form
    pub staging: UploadStaging,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state with staging sized from the config
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let staging = UploadStaging::new(config.uploads.max_bytes, config.staging_ttl());
        Self {
            db,
            staging,
            config: Arc::new(config),
        }
    }

    /// Secret for signing session tokens
    pub fn jwt_secret(&self) -> &str {
        &self.config.auth.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check
/// └── /v1/
///     ├── /overview                    # Counts for everyone, latest items for members
///     ├── /auth/{register,login,refresh}
///     ├── /me
///     ├── /papers, /papers/:id/download
///     ├── /datasets, /datasets/:id/download
///     ├── /uploads                     # Stage a file for the next publish
///     ├── /news
///     ├── /chat/channels, /chat/:channel
///     ├── /directory/{researchers,doctors,patients}
///     └── /admin/users, /admin/users/:id/{role,deactivate}
/// ```
///
/// # Middleware Stack
///
/// Innermost first:
/// 1. Actor resolution (every request gets an `Actor`, possibly anonymous)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
///
/// Role checks happen in the handlers' core calls, not in middleware.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let library_routes = Router::new()
        .route(
            "/papers",
            get(routes::library::list_papers).post(routes::library::publish_paper),
        )
        .route("/papers/:id/download", get(routes::library::download_paper))
        .route(
            "/datasets",
            get(routes::library::list_datasets).post(routes::library::publish_dataset),
        )
        .route("/datasets/:id/download", get(routes::library::download_dataset))
        .route(
            "/uploads",
            post(routes::uploads::stage_upload)
                .layer(DefaultBodyLimit::max(state.config.body_limit())),
        );

    let chat_routes = Router::new()
        .route("/channels", get(routes::chat::list_channels))
        .route(
            "/:channel",
            get(routes::chat::read_channel).post(routes::chat::send_message),
        );

    let directory_routes = Router::new()
        .route("/researchers", get(routes::directory::researchers))
        .route("/doctors", get(routes::directory::doctors))
        .route("/patients", get(routes::directory::patients));

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/users/:id/role", post(routes::admin::set_role))
        .route("/users/:id/deactivate", post(routes::admin::deactivate));

    let v1_routes = Router::new()
        .route("/overview", get(routes::overview::overview))
        .route("/me", get(routes::auth::me))
        .route(
            "/news",
            get(routes::news::list_news).post(routes::news::publish_news),
        )
        .nest("/auth", auth_routes)
        .nest("/chat", chat_routes)
        .nest("/directory", directory_routes)
        .nest("/admin", admin_routes)
        .merge(library_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(middleware::from_fn(create_actor_middleware(
            state.db.clone(),
            Arc::from(state.config.auth.secret.as_str()),
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(middleware::from_fn(create_security_headers_middleware(
            state.config.api.production,
        )))
        .with_state(state)
}
