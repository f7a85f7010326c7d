//! Input resolution algorithm
//!
//! This module implements the constraint-satisfaction search that picks
//! one concrete version per job input such that every "passed" constraint
//! is honoured simultaneously:
//!
//! - [`JobSet`]: compact ordered set of upstream job ids
//! - [`VersionsDb`]: the read-only snapshot contract the search runs over
//! - [`InputConfig`]: one normalised input of the scheduled job
//! - [`resolve`]: the depth-first search itself
//!
//! The search is deterministic for a fixed snapshot: inputs are processed
//! in declaration order, upstream jobs in [`VersionsDb::order_passed_jobs`]
//! order, builds newest first, and build outputs in the order the snapshot
//! returns them.

mod input_config;
mod job_set;
mod resolver;
mod versions_db;

// Re-export the algorithm surface
pub use input_config::InputConfig;
pub use job_set::JobSet;
pub use resolver::{resolve, Candidate, Resolution, ResolveError, ResolveFailure};
pub use versions_db::{BuildOutput, VersionsDb};
