//! Read-only version database contract consumed by the resolver.

use async_trait::async_trait;

use conveyor_common::types::{BuildId, JobId, ResourceId, VersionId};

use super::JobSet;

/// One `(resource, version)` pair emitted by a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOutput {
    pub resource_id: ResourceId,
    pub version_id: VersionId,
}

/// Snapshot view over resources, versions, builds, and outputs.
///
/// Implementations must be snapshot-consistent: repeated calls during one
/// resolution observe the same universe. All list-returning queries yield
/// deterministic orderings, newest first with ties broken by descending
/// id. Errors propagate unchanged and are treated as fatal by the
/// resolver.
#[async_trait]
pub trait VersionsDb: Send + Sync {
    /// True when the version must never be selected.
    ///
    /// The disabled set is part of the snapshot and is consulted without a
    /// database round-trip.
    fn is_disabled(&self, version_id: VersionId) -> bool;

    /// Newest enabled version of the resource, if it has any.
    ///
    /// Disabled versions are excluded at the contract level; a caller that
    /// receives `Some(v)` may select `v` without re-checking the disabled
    /// set.
    async fn latest_version_of_resource(
        &self,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>>;

    /// Existence probe for pinned version ids.
    async fn find_version_of_resource(&self, version_id: VersionId) -> anyhow::Result<bool>;

    /// Most recent build of the job that consumed inputs.
    async fn latest_build_id(&self, job_id: JobId) -> anyhow::Result<Option<BuildId>>;

    /// Successor of the version `build_id` used for the resource, under
    /// "use every version" semantics.
    ///
    /// Returns the newest enabled version when the build did not use the
    /// resource at all, and `None` when the build already consumed the
    /// newest version.
    async fn next_every_version(
        &self,
        build_id: BuildId,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>>;

    /// Latest build of `from_job_id` whose outputs were an input to
    /// `build_id`.
    async fn latest_constraint_build_id(
        &self,
        build_id: BuildId,
        from_job_id: JobId,
    ) -> anyhow::Result<Option<BuildId>>;

    /// Successful builds of the job strictly newer than `after_build_id`,
    /// newest first.
    async fn unused_builds(
        &self,
        after_build_id: BuildId,
        job_id: JobId,
    ) -> anyhow::Result<Vec<BuildId>>;

    /// All successful builds of the job, newest first.
    async fn successful_builds(&self, job_id: JobId) -> anyhow::Result<Vec<BuildId>>;

    /// Outputs emitted by the build, in a deterministic order (ascending
    /// resource id, then version id).
    async fn build_outputs(&self, build_id: BuildId) -> anyhow::Result<Vec<BuildOutput>>;

    /// The upstream jobs of a passed constraint, ordered to maximise early
    /// pruning: fewest distinct outputs first, ties ascending by job id.
    async fn order_passed_jobs(
        &self,
        job_id: JobId,
        passed: &JobSet,
    ) -> anyhow::Result<Vec<JobId>>;
}
