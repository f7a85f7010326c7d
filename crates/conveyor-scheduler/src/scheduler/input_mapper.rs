//! Input-config transformation and input mapping for one scheduled job.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use conveyor_common::types::JobId;

use crate::algorithm::{self, InputConfig, Resolution, ResolveError, VersionsDb};
use crate::models::{BuildInput, DeclaredInput, InputMapping, Job, Resources, VersionPolicy};

/// Normalise a job's declared inputs against the current resources.
///
/// Walks the inputs in declaration order. Inputs naming an unknown
/// resource are skipped with a warning; a resource carrying a pipeline-
/// level pin has its declared version policy overridden by that pin.
pub fn transform_input_configs(
    job_name: &str,
    job_id: JobId,
    inputs: &[DeclaredInput],
    resources: &Resources,
) -> Vec<InputConfig> {
    let mut configs = Vec::with_capacity(inputs.len());

    for input in inputs {
        let Some(resource) = resources.lookup(&input.resource) else {
            warn!(
                job = %job_name,
                input = %input.name,
                resource = %input.resource,
                "unknown resource, skipping input"
            );
            continue;
        };

        // Pipeline-level pin dominates the job-level policy.
        let policy = match resource.current_pinned_version() {
            Some(pinned) => VersionPolicy::Pinned(pinned),
            None => input.version.clone(),
        };

        let (pinned_version, use_every_version) = match policy {
            VersionPolicy::Pinned(version) => (Some(version), false),
            VersionPolicy::Every => (None, true),
            VersionPolicy::Latest => (None, false),
        };

        configs.push(InputConfig {
            name: input.name.clone(),
            job_id,
            resource_id: resource.id,
            passed: input.passed.clone(),
            pinned_version,
            use_every_version,
            trigger: input.trigger,
        });
    }

    configs
}

/// Resolves a job's inputs and persists the resulting mapping.
pub struct InputMapper;

impl InputMapper {
    pub fn new() -> Self {
        Self
    }

    /// Compute and persist the job's next input mapping.
    ///
    /// Returns the mapping together with whether resolution succeeded.
    /// On an unresolved search the empty mapping is persisted with
    /// `resolved = false`. Fatal errors and cancellation propagate before
    /// anything is persisted.
    pub async fn map_inputs(
        &self,
        db: &dyn VersionsDb,
        job: &dyn Job,
        resources: &Resources,
        cancel: &CancellationToken,
    ) -> Result<(InputMapping, bool), ResolveError> {
        let configs = transform_input_configs(job.name(), job.id(), job.inputs(), resources);

        let resolution = algorithm::resolve(db, &configs, cancel).await?;

        let (mapping, resolved) = match resolution {
            Resolution::Resolved(candidates) => {
                let mut mapping = InputMapping::new();

                for candidate in candidates {
                    let version_id = candidate.version.ok_or_else(|| {
                        anyhow::anyhow!(
                            "resolved candidate '{}' has no version",
                            candidate.input_name
                        )
                    })?;

                    let used = job
                        .input_version_used(&candidate.input_name, version_id)
                        .await?;

                    mapping.insert(
                        candidate.input_name.clone(),
                        BuildInput {
                            name: candidate.input_name,
                            version_id,
                            source_build_ids: candidate.source_build_ids,
                            first_occurrence: !used,
                        },
                    );
                }

                (mapping, true)
            },
            Resolution::Unresolved(failures) => {
                for (config, failure) in configs.iter().zip(&failures) {
                    if let Some(failure) = failure {
                        debug!(
                            job = %job.name(),
                            input = %config.name,
                            %failure,
                            "input could not be resolved"
                        );
                    }
                }

                (InputMapping::new(), false)
            },
        };

        job.save_next_input_mapping(&mapping, resolved).await?;

        Ok((mapping, resolved))
    }
}
