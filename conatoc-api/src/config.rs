/// Configuration management for the portal server
///
/// Loaded once from environment variables (and a `.env` file, if present)
/// at startup and validated before anything else runs.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8050)
/// - `DATABASE_URL`: SQLite URL (default: sqlite://data/app.db)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SECRET_KEY`: Session signing secret (required in production, 32+ chars)
/// - `UPLOAD_MAX_MB`: Largest accepted upload (default: 10)
/// - `UPLOAD_STAGING_TTL_SECS`: How long a staged upload waits for publish (default: 3600)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME`: Bootstrap admin account
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS and the strict secret check (default: false)
///
/// # Example
///
/// ```no_run
/// use conatoc_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::time::Duration;

use conatoc_shared::identity::AdminBootstrap;
use serde::{Deserialize, Serialize};

/// Signing secret used when none is configured outside production
const DEV_SECRET_KEY: &str = "conatoc-dev-secret-key-change-me-before-deploying";

/// Minimum secret length accepted in production
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session token configuration
    pub auth: AuthConfig,

    /// Upload limits
    pub uploads: UploadConfig,

    /// Account created on first start
    pub admin: AdminConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS header, strict secret check)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for signing session tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes
    pub max_bytes: usize,

    /// Lifetime of a staged upload, in seconds
    pub staging_ttl_seconds: u64,
}

/// Bootstrap admin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,

    #[serde(skip_serializing)]
    pub password: String,

    pub name: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse, or if
    /// `PRODUCTION` is set and `SECRET_KEY` is missing or shorter than
    /// 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let production = env::var("PRODUCTION")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let api_port = env_or("API_PORT", "8050")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;

        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let upload_max_mb = env_or("UPLOAD_MAX_MB", "10")
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("UPLOAD_MAX_MB is not a number: {}", e))?;

        let staging_ttl_seconds = env_or("UPLOAD_STAGING_TTL_SECS", "3600")
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("UPLOAD_STAGING_TTL_SECS is not a number: {}", e))?;

        let secret = resolve_secret(env::var("SECRET_KEY").ok(), production)?;

        let config = Self {
            api: ApiConfig {
                host: env_or("API_HOST", "0.0.0.0"),
                port: api_port,
                cors_origins: parse_origins(&env_or("CORS_ORIGINS", "*")),
                production,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite://data/app.db"),
                max_connections,
            },
            auth: AuthConfig { secret },
            uploads: UploadConfig {
                max_bytes: upload_max_mb.saturating_mul(1024 * 1024),
                staging_ttl_seconds,
            },
            admin: AdminConfig {
                email: env_or("ADMIN_EMAIL", "admin@conatoc.net"),
                password: env_or("ADMIN_PASSWORD", "ChangeMeNow!"),
                name: env_or("ADMIN_NAME", "CONATOC Admin"),
            },
        };

        if config.uploads.max_bytes == 0 {
            anyhow::bail!("UPLOAD_MAX_MB must be at least 1");
        }

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Lifetime of a staged upload
    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.uploads.staging_ttl_seconds)
    }

    /// Request body cap for upload endpoints
    ///
    /// Files arrive base64-encoded inside JSON, which inflates them by a
    /// third; the extra 64 KiB covers the surrounding fields.
    pub fn body_limit(&self) -> usize {
        self.uploads
            .max_bytes
            .saturating_mul(4)
            .div_ceil(3)
            .saturating_add(64 * 1024)
    }

    /// Settings for the bootstrap admin account
    pub fn admin_bootstrap(&self) -> AdminBootstrap {
        AdminBootstrap {
            email: self.admin.email.clone(),
            password: self.admin.password.clone(),
            name: self.admin.name.clone(),
            affiliation: Some("CONATOC".to_string()),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_secret(configured: Option<String>, production: bool) -> anyhow::Result<String> {
    match configured.filter(|s| !s.trim().is_empty()) {
        Some(secret) if production && secret.len() < MIN_SECRET_LEN => {
            anyhow::bail!("SECRET_KEY must be at least {} characters long", MIN_SECRET_LEN)
        }
        Some(secret) => Ok(secret),
        None if production => anyhow::bail!("SECRET_KEY environment variable is required in production"),
        None => {
            tracing::warn!("SECRET_KEY not set; using the development secret");
            Ok(DEV_SECRET_KEY.to_string())
        }
    }
}
