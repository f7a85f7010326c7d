//! Scheduler configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings for the scheduling loop, loaded from the environment.
///
/// Recognised variables (all optional):
///
/// - `SCHEDULER_PIPELINE_ID`: pipeline to schedule (default 1)
/// - `SCHEDULER_INTERVAL_SECS`: seconds between scheduling passes
/// - `SCHEDULER_RESOLVE_TIMEOUT_SECS`: per-job resolution deadline; the
///   cancellation token is fired when it elapses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_pipeline_id")]
    pub pipeline_id: i64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
}

fn default_pipeline_id() -> i64 {
    1
}

fn default_interval_secs() -> u64 {
    10
}

fn default_resolve_timeout_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pipeline_id: default_pipeline_id(),
            interval_secs: default_interval_secs(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from the environment (and `.env` if present).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("SCHEDULER"))
            .build()
            .context("failed to read scheduler configuration")?;

        settings
            .try_deserialize()
            .context("invalid scheduler configuration")
    }
}
