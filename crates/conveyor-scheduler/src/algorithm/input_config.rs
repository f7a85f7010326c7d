//! Normalised resolver inputs.

use conveyor_common::types::{JobId, ResourceId, VersionId};

use super::JobSet;

/// One declared input of the scheduled job, normalised against the
/// current version database.
///
/// Produced by the input-config transformer in declaration order and
/// consumed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Input name as the job sees it.
    pub name: String,

    /// The scheduled job's id (same on all inputs of one resolution).
    pub job_id: JobId,

    /// Which resource supplies this input.
    pub resource_id: ResourceId,

    /// Upstream jobs every chosen version must have flowed through
    /// together. Empty means no upstream constraint.
    pub passed: JobSet,

    /// Force exactly this version. The resolver still verifies it exists
    /// and is not disabled.
    pub pinned_version: Option<VersionId>,

    /// Advance through versions one at a time rather than jumping to the
    /// newest.
    pub use_every_version: bool,

    /// A first-occurrence version of this input must create a pending
    /// build.
    pub trigger: bool,
}
