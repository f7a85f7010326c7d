//! Domain models and external interfaces consumed by the scheduler.
//!
//! The durable job store, the pipeline-configuration parser, and the
//! build-start machinery all live outside this crate; the scheduler sees
//! them only through the [`Job`], [`Resources`], and [`BuildStarter`]
//! surfaces below.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use conveyor_common::types::{BuildId, JobId, ResourceId, VersionId};

use crate::algorithm::JobSet;

/// Version selection policy declared on a job input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Jump to the newest version.
    #[default]
    Latest,
    /// Advance through versions one at a time.
    Every,
    /// Use exactly this version.
    Pinned(VersionId),
}

/// One input as declared in the job's pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredInput {
    /// Input name as the job sees it.
    pub name: String,

    /// Name of the resource supplying this input.
    pub resource: String,

    /// Upstream jobs the chosen version must have flowed through.
    #[serde(default)]
    pub passed: JobSet,

    /// Declared version policy; a pipeline-level pin overrides it.
    #[serde(default)]
    pub version: VersionPolicy,

    /// A first-occurrence version of this input must create a pending
    /// build.
    #[serde(default)]
    pub trigger: bool,
}

/// One entry of a job's next input mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInput {
    /// Input name.
    pub name: String,

    /// Chosen version.
    pub version_id: VersionId,

    /// Builds whose outputs vouched for the version.
    pub source_build_ids: Vec<BuildId>,

    /// True when this (input, version) pair has never been delivered to
    /// the job before.
    pub first_occurrence: bool,
}

/// The job's pending input mapping, keyed by input name.
pub type InputMapping = BTreeMap<String, BuildInput>;

/// A named external artifact source known to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,

    /// Pipeline-level pin, dominating any job-level pin.
    pub pinned_version: Option<VersionId>,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pinned_version: None,
        }
    }

    /// The pipeline-level pin for this resource, if any.
    pub fn current_pinned_version(&self) -> Option<VersionId> {
        self.pinned_version
    }
}

/// The pipeline's resources, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources(Vec<Resource>);

impl Resources {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self(resources)
    }

    /// Find a resource by name.
    pub fn lookup(&self, name: &str) -> Option<&Resource> {
        self.0.iter().find(|resource| resource.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.0.iter()
    }

    pub fn push(&mut self, resource: Resource) {
        self.0.push(resource);
    }
}

impl FromIterator<Resource> for Resources {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A versioned resource type, passed through to the build starter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    pub type_name: String,
    pub version: Option<VersionId>,
}

/// Versioned resource types for one pipeline.
pub type ResourceTypes = Vec<ResourceType>;

/// Job-facing persistence, consumed but not defined by this crate.
#[async_trait]
pub trait Job: Send + Sync {
    fn id(&self) -> JobId;

    fn name(&self) -> &str;

    /// Declared inputs in declaration order.
    fn inputs(&self) -> &[DeclaredInput];

    /// Overwrite the job's pending input mapping.
    async fn save_next_input_mapping(
        &self,
        mapping: &InputMapping,
        resolved: bool,
    ) -> anyhow::Result<()>;

    /// Read the full next build inputs persisted by the input mapper.
    ///
    /// `None` when no complete mapping is available.
    async fn get_full_next_build_inputs(&self) -> anyhow::Result<Option<Vec<BuildInput>>>;

    /// Create a pending build if none exists. Idempotent.
    async fn ensure_pending_build_exists(&self) -> anyhow::Result<()>;

    /// True when this input name has already been delivered with this
    /// version to this job.
    async fn input_version_used(
        &self,
        input_name: &str,
        version_id: VersionId,
    ) -> anyhow::Result<bool>;
}

/// Build-start machinery, consumed but not defined by this crate.
#[async_trait]
pub trait BuildStarter: Send + Sync {
    /// Attempt to start any pending builds of the job.
    async fn try_start_pending_builds_for_job(
        &self,
        job: &dyn Job,
        resources: &Resources,
        resource_types: &ResourceTypes,
    ) -> anyhow::Result<()>;
}
