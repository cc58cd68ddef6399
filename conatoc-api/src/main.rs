//! # CONATOC Net Portal Server
//!
//! Members-only portal for the CONATOC research collaborative: papers,
//! datasets, news, chat and member directories behind role-based access.
//!
//! ## Startup
//!
//! 1. Load and validate configuration from the environment
//! 2. Open the SQLite pool and apply migrations
//! 3. Ensure the bootstrap admin account exists
//! 4. Serve HTTP until Ctrl-C
//!
//! ## Usage
//!
//! ```bash
//! SECRET_KEY=$(openssl rand -hex 32) cargo run -p conatoc-api
//! ```

use conatoc_api::{
    app::{build_router, AppState},
    config::Config,
};
use conatoc_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    identity::{bootstrap_admin, BootstrapOutcome},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("CONATOC Net v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    match bootstrap_admin(&pool, &config.admin_bootstrap()).await? {
        BootstrapOutcome::Created(user) => {
            tracing::warn!(email = %user.email, "Created bootstrap admin; change its password");
        }
        BootstrapOutcome::Existing(user) => {
            tracing::debug!(email = %user.email, "Bootstrap admin already present");
        }
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Plain or JSON log output, filtered by `RUST_LOG`
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conatoc_api=debug,conatoc_shared=info,tower_http=debug".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
