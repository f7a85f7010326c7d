//! Database connection management for the scheduler.
//!
//! The version database snapshot ([`versions::PostgresVersionsDb`]) and
//! the pipeline resources read ([`resources`]) share one read-only
//! [`PgPool`] built here. A scheduling pass issues many short queries
//! (one round-trip per snapshot call), so the pool keeps a small warm
//! floor and a short acquire timeout: a saturated store should surface
//! as an error on the current pass rather than stall it past the next
//! scheduling interval.

pub mod resources;
pub mod versions;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

/// Errors from pool setup.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid database configuration: {0}")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection settings for the scheduler's read pool.
///
/// `DATABASE_URL` is required; `DB_MAX_CONNECTIONS`,
/// `DB_MIN_CONNECTIONS`, and `DB_ACQUIRE_TIMEOUT_SECS` override the
/// defaults.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/conveyor".to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl DbConfig {
    /// Load settings from the environment (and `.env` if present).
    pub fn from_env() -> DbResult<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL is not set".to_string()))?;

        let defaults = Self::default();

        Ok(Self {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            acquire_timeout: Duration::from_secs(env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )),
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Build the shared read pool.
pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "database pool ready"
    );

    Ok(pool)
}
