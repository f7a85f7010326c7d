//! Conveyor Scheduler Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
//!
//! Input resolution core for the Conveyor pipeline scheduler.
//!
//! # Overview
//!
//! Given a job whose execution depends on several named resource inputs,
//! each optionally constrained by "must have passed through these upstream
//! jobs together," this crate selects a coherent set of concrete resource
//! versions that satisfies every constraint simultaneously, or reports
//! that no such set exists.
//!
//! - **Algorithm**: the depth-first constraint search over the version
//!   and build graph ([`algorithm`])
//! - **Scheduler**: the per-job wrapper that resolves inputs, persists
//!   the mapping, and decides whether a pending build is needed
//!   ([`scheduler`])
//! - **Models**: the job, resource, and build-starter interfaces the
//!   scheduler consumes ([`models`])
//! - **Database**: the Postgres-backed version database snapshot
//!   ([`db`])
//!
//! # Architecture
//!
//! The resolver is single-threaded per invocation and sees the version
//! database as an immutable snapshot; the scheduler is invoked from a
//! higher-level loop with one task per job. Cancellation is threaded from
//! the scheduler entry point down into the resolver via a
//! [`tokio_util::sync::CancellationToken`].
//!
//! # Example
//!
//! ```no_run
//! use conveyor_scheduler::db::{self, DbConfig};
//! use conveyor_scheduler::db::versions::PostgresVersionsDb;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DbConfig::from_env()?;
//!     let pool = db::create_pool(&config).await?;
//!     let snapshot = PostgresVersionsDb::load(pool, 1).await?;
//!     let _ = snapshot;
//!     Ok(())
//! }
//! ```

pub mod algorithm;
pub mod config;
pub mod db;
pub mod models;
pub mod scheduler;

// Re-export commonly used types
pub use algorithm::{
    Candidate, InputConfig, JobSet, Resolution, ResolveError, ResolveFailure, VersionsDb,
};
pub use scheduler::{InputMapper, Scheduler};
