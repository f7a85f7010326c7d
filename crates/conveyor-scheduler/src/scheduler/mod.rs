//! Per-job scheduling wrapper.
//!
//! [`Scheduler::schedule`] runs the full sequence for a single job:
//! resolve and persist the input mapping, decide whether a pending build
//! is needed, then hand pending builds to the starter. Jobs are scheduled
//! independently by a higher-level loop, typically one task per job.

mod build_starter;
mod input_mapper;

pub use build_starter::ensure_pending_build_exists;
pub use input_mapper::{transform_input_configs, InputMapper};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::algorithm::VersionsDb;
use crate::models::{BuildStarter, Job, ResourceTypes, Resources};

/// Schedules a single job against a version database snapshot.
pub struct Scheduler<S: BuildStarter> {
    input_mapper: InputMapper,
    build_starter: S,
}

impl<S: BuildStarter> Scheduler<S> {
    pub fn new(build_starter: S) -> Self {
        Self {
            input_mapper: InputMapper::new(),
            build_starter,
        }
    }

    /// The starter handed to [`Scheduler::new`].
    pub fn build_starter(&self) -> &S {
        &self.build_starter
    }

    /// Schedule one job and report how long it took, keyed by job name.
    ///
    /// Errors at any step abort the remaining steps for the job; state
    /// persisted by earlier steps is not rolled back.
    pub async fn schedule(
        &self,
        versions: &dyn VersionsDb,
        job: &dyn Job,
        resources: &Resources,
        resource_types: &ResourceTypes,
        cancel: &CancellationToken,
    ) -> anyhow::Result<HashMap<String, Duration>> {
        let started = Instant::now();

        let result = self
            .schedule_job(versions, job, resources, resource_types, cancel)
            .await;

        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                let mut job_scheduling_time = HashMap::new();
                job_scheduling_time.insert(job.name().to_string(), elapsed);
                Ok(job_scheduling_time)
            },
            Err(err) => {
                error!(job = %job.name(), elapsed = ?elapsed, "scheduling failed: {err:#}");
                Err(err)
            },
        }
    }

    async fn schedule_job(
        &self,
        versions: &dyn VersionsDb,
        job: &dyn Job,
        resources: &Resources,
        resource_types: &ResourceTypes,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let (_mapping, resolved) = self
            .input_mapper
            .map_inputs(versions, job, resources, cancel)
            .await?;

        if resolved {
            ensure_pending_build_exists(job).await?;
        } else {
            debug!(job = %job.name(), "inputs not resolved, skipping pending build gate");
        }

        self.build_starter
            .try_start_pending_builds_for_job(job, resources, resource_types)
            .await?;

        Ok(())
    }
}
