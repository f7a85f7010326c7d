//! Shared in-memory fakes for scheduler and resolver tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use conveyor_common::types::{BuildId, JobId, ResourceId, VersionId};
use conveyor_scheduler::algorithm::{BuildOutput, JobSet, VersionsDb};
use conveyor_scheduler::models::{
    BuildInput, BuildStarter, DeclaredInput, InputMapping, Job, ResourceTypes, Resources,
};

/// One recorded build in the fake store.
#[derive(Debug, Clone)]
pub struct FakeBuild {
    pub job_id: JobId,
    pub succeeded: bool,
    pub inputs: Vec<(ResourceId, VersionId)>,
    pub outputs: Vec<(ResourceId, VersionId)>,
}

/// In-memory version database snapshot.
///
/// Versions are registered per resource in check order (oldest first);
/// builds are keyed by id, so "newest first" is descending id order.
#[derive(Debug, Default)]
pub struct FakeVersionsDb {
    versions: HashMap<ResourceId, Vec<VersionId>>,
    disabled: HashSet<VersionId>,
    builds: BTreeMap<BuildId, FakeBuild>,
    pub fail_latest_version: bool,
}

impl FakeVersionsDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource's versions, oldest first.
    pub fn with_versions(mut self, resource_id: ResourceId, versions: &[VersionId]) -> Self {
        self.versions.insert(resource_id, versions.to_vec());
        self
    }

    pub fn disable(mut self, version_id: VersionId) -> Self {
        self.disabled.insert(version_id);
        self
    }

    /// Record a successful build that emitted the given outputs.
    pub fn with_successful_build(
        mut self,
        build_id: BuildId,
        job_id: JobId,
        outputs: &[(ResourceId, VersionId)],
    ) -> Self {
        self.builds.insert(
            build_id,
            FakeBuild {
                job_id,
                succeeded: true,
                inputs: Vec::new(),
                outputs: outputs.to_vec(),
            },
        );
        self
    }

    /// Record a build of the scheduled job together with the inputs it
    /// consumed (backs the "use every version" queries).
    pub fn with_consuming_build(
        mut self,
        build_id: BuildId,
        job_id: JobId,
        inputs: &[(ResourceId, VersionId)],
    ) -> Self {
        self.builds.insert(
            build_id,
            FakeBuild {
                job_id,
                succeeded: true,
                inputs: inputs.to_vec(),
                outputs: Vec::new(),
            },
        );
        self
    }

    fn enabled_versions(&self, resource_id: ResourceId) -> Vec<VersionId> {
        self.versions
            .get(&resource_id)
            .map(|versions| {
                versions
                    .iter()
                    .copied()
                    .filter(|v| !self.disabled.contains(v))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl VersionsDb for FakeVersionsDb {
    fn is_disabled(&self, version_id: VersionId) -> bool {
        self.disabled.contains(&version_id)
    }

    async fn latest_version_of_resource(
        &self,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>> {
        if self.fail_latest_version {
            anyhow::bail!("latest version query failed");
        }

        Ok(self.enabled_versions(resource_id).last().copied())
    }

    async fn find_version_of_resource(&self, version_id: VersionId) -> anyhow::Result<bool> {
        Ok(self
            .versions
            .values()
            .any(|versions| versions.contains(&version_id)))
    }

    async fn latest_build_id(&self, job_id: JobId) -> anyhow::Result<Option<BuildId>> {
        Ok(self
            .builds
            .iter()
            .rev()
            .find(|(_, build)| build.job_id == job_id && !build.inputs.is_empty())
            .map(|(&id, _)| id))
    }

    async fn next_every_version(
        &self,
        build_id: BuildId,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>> {
        let used = self.builds.get(&build_id).and_then(|build| {
            build
                .inputs
                .iter()
                .find(|(resource, _)| *resource == resource_id)
                .map(|&(_, version)| version)
        });

        let Some(used) = used else {
            return self.latest_version_of_resource(resource_id).await;
        };

        let all = self.versions.get(&resource_id).cloned().unwrap_or_default();
        let position = all.iter().position(|&v| v == used);

        Ok(position.and_then(|at| {
            all[at + 1..]
                .iter()
                .find(|&&version| !self.disabled.contains(&version))
                .copied()
        }))
    }

    async fn latest_constraint_build_id(
        &self,
        build_id: BuildId,
        from_job_id: JobId,
    ) -> anyhow::Result<Option<BuildId>> {
        let Some(consumer) = self.builds.get(&build_id) else {
            return Ok(None);
        };

        Ok(self
            .builds
            .iter()
            .rev()
            .find(|(_, build)| {
                build.job_id == from_job_id
                    && build
                        .outputs
                        .iter()
                        .any(|output| consumer.inputs.contains(output))
            })
            .map(|(&id, _)| id))
    }

    async fn unused_builds(
        &self,
        after_build_id: BuildId,
        job_id: JobId,
    ) -> anyhow::Result<Vec<BuildId>> {
        Ok(self
            .builds
            .iter()
            .rev()
            .filter(|(&id, build)| {
                id > after_build_id && build.job_id == job_id && build.succeeded
            })
            .map(|(&id, _)| id)
            .collect())
    }

    async fn successful_builds(&self, job_id: JobId) -> anyhow::Result<Vec<BuildId>> {
        Ok(self
            .builds
            .iter()
            .rev()
            .filter(|(_, build)| build.job_id == job_id && build.succeeded)
            .map(|(&id, _)| id)
            .collect())
    }

    async fn build_outputs(&self, build_id: BuildId) -> anyhow::Result<Vec<BuildOutput>> {
        Ok(self
            .builds
            .get(&build_id)
            .map(|build| {
                build
                    .outputs
                    .iter()
                    .map(|&(resource_id, version_id)| BuildOutput {
                        resource_id,
                        version_id,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn order_passed_jobs(
        &self,
        _job_id: JobId,
        passed: &JobSet,
    ) -> anyhow::Result<Vec<JobId>> {
        let mut ordered: Vec<JobId> = passed.iter().collect();

        ordered.sort_by_key(|&job| {
            let distinct: HashSet<(ResourceId, VersionId)> = self
                .builds
                .values()
                .filter(|build| build.job_id == job)
                .flat_map(|build| build.outputs.iter().copied())
                .collect();
            (distinct.len(), job.0)
        });

        Ok(ordered)
    }
}

/// In-memory job with recording persistence.
pub struct FakeJob {
    pub id: JobId,
    pub name: String,
    pub inputs: Vec<DeclaredInput>,
    /// (input name, version) pairs delivered to the job before.
    pub used_versions: HashSet<(String, VersionId)>,
    pub saved_mappings: Mutex<Vec<(InputMapping, bool)>>,
    pub ensure_pending_calls: AtomicUsize,
}

impl FakeJob {
    pub fn new(id: JobId, name: &str, inputs: Vec<DeclaredInput>) -> Self {
        Self {
            id,
            name: name.to_string(),
            inputs,
            used_versions: HashSet::new(),
            saved_mappings: Mutex::new(Vec::new()),
            ensure_pending_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_used_version(mut self, input_name: &str, version_id: VersionId) -> Self {
        self.used_versions.insert((input_name.to_string(), version_id));
        self
    }

    /// The most recently persisted mapping, if any.
    pub fn last_saved(&self) -> Option<(InputMapping, bool)> {
        self.saved_mappings.lock().unwrap().last().cloned()
    }

    pub fn pending_build_requests(&self) -> usize {
        self.ensure_pending_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Job for FakeJob {
    fn id(&self) -> JobId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[DeclaredInput] {
        &self.inputs
    }

    async fn save_next_input_mapping(
        &self,
        mapping: &InputMapping,
        resolved: bool,
    ) -> anyhow::Result<()> {
        self.saved_mappings
            .lock()
            .unwrap()
            .push((mapping.clone(), resolved));
        Ok(())
    }

    async fn get_full_next_build_inputs(&self) -> anyhow::Result<Option<Vec<BuildInput>>> {
        // Read-back of the most recent resolved mapping.
        Ok(self.last_saved().and_then(|(mapping, resolved)| {
            resolved.then(|| mapping.values().cloned().collect())
        }))
    }

    async fn ensure_pending_build_exists(&self) -> anyhow::Result<()> {
        self.ensure_pending_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn input_version_used(
        &self,
        input_name: &str,
        version_id: VersionId,
    ) -> anyhow::Result<bool> {
        Ok(self
            .used_versions
            .contains(&(input_name.to_string(), version_id)))
    }
}

/// Build starter that records invocations.
#[derive(Default)]
pub struct FakeBuildStarter {
    pub calls: AtomicUsize,
}

impl FakeBuildStarter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildStarter for FakeBuildStarter {
    async fn try_start_pending_builds_for_job(
        &self,
        _job: &dyn Job,
        _resources: &Resources,
        _resource_types: &ResourceTypes,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
