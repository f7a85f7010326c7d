//! Depth-first input resolution.
//!
//! [`resolve`] walks the scheduled job's inputs in declaration order and
//! picks one version per input. Inputs without a passed constraint take
//! the pinned, next-every, or newest version directly; constrained inputs
//! search the upstream jobs' build histories, newest build first, letting
//! each matching build vouch for every candidate it can pin at once. A
//! build whose outputs conflict with already-pinned candidates is
//! abandoned and an older build is tried; the per-build `restore` map
//! rolls back every slot the abandoned build touched so sibling branches
//! observe a pristine state.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use conveyor_common::types::{BuildId, VersionId};

use super::{InputConfig, JobSet, VersionsDb};

/// Fatal resolution errors.
///
/// Per-input conditions (missing pin, exhausted versions) are not errors;
/// they are recorded per slot as [`ResolveFailure`] diagnostics.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The cancellation token fired. No partial result is produced.
    #[error("input resolution cancelled")]
    Cancelled,

    /// A version database query failed.
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// Why an individual input could not be resolved.
///
/// Preserved for diagnostics when the overall search fails; never
/// returned on success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The resource has no versions at all.
    #[error("latest version of resource not found")]
    LatestVersionNotFound,

    /// "Use every version" cannot advance past the last consumed version.
    #[error("version of resource not found")]
    VersionNotFound,

    /// The pinned version does not exist or is disabled.
    #[error("pinned version {id} not found")]
    PinnedVersionNotFound { id: VersionId },
}

/// One resolved (or in-flight) input slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Chosen version; `None` until the search settles this slot.
    pub version: Option<VersionId>,

    /// Input name, copied from the config for diagnostics and mapping.
    pub input_name: String,

    /// Copy of the input's passed constraint.
    pub passed_jobs: JobSet,

    /// Upstream jobs that confirmed this candidate via a matching build.
    pub vouched_for_by: JobSet,

    /// Builds providing the evidence, in the order they vouched.
    pub source_build_ids: Vec<BuildId>,
}

impl Candidate {
    /// An empty slot for the given input.
    fn unresolved(config: &InputConfig) -> Self {
        Self {
            version: None,
            input_name: config.name.clone(),
            passed_jobs: config.passed.clone(),
            vouched_for_by: JobSet::new(),
            source_build_ids: Vec::new(),
        }
    }

    /// A slot settled directly on `version`, with no vouching jobs.
    fn chosen(version: VersionId, config: &InputConfig) -> Self {
        Self {
            version: Some(version),
            ..Self::unresolved(config)
        }
    }
}

/// Outcome of a resolution pass.
#[derive(Debug)]
pub enum Resolution {
    /// Every input has a version, every passed constraint is vouched for.
    Resolved(Vec<Candidate>),

    /// No consistent assignment exists. One diagnostic per input slot
    /// where an individual failure was observed.
    Unresolved(Vec<Option<ResolveFailure>>),
}

/// Resolve one version per input, or report that no consistent set
/// exists.
///
/// Deterministic for a fixed snapshot: identical inputs produce identical
/// candidates, including `source_build_ids` order. Cancellation is
/// checked between input slots and before each recursive descent.
pub async fn resolve(
    db: &dyn VersionsDb,
    configs: &[InputConfig],
    cancel: &CancellationToken,
) -> Result<Resolution, ResolveError> {
    let mut candidates: Vec<Candidate> = configs.iter().map(Candidate::unresolved).collect();
    let mut failures: Vec<Option<ResolveFailure>> = vec![None; configs.len()];

    let resolved = resolve_frame(0, db, configs, &mut candidates, &mut failures, cancel).await?;

    if resolved {
        Ok(Resolution::Resolved(candidates))
    } else {
        Ok(Resolution::Unresolved(failures))
    }
}

/// One recursion frame over the shared candidate slots.
///
/// Boxed because the future recurses through itself; the `candidates`
/// slice is threaded mutably through every frame and restored on every
/// failing exit path.
fn resolve_frame<'a>(
    depth: usize,
    db: &'a dyn VersionsDb,
    configs: &'a [InputConfig],
    candidates: &'a mut [Candidate],
    failures: &'a mut [Option<ResolveFailure>],
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<bool, ResolveError>> {
    Box::pin(async move {
        'slots: for (i, config) in configs.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            if config.passed.is_empty() {
                // Coming from a recursive call the slot may already be
                // settled.
                if candidates[i].version.is_some() {
                    continue;
                }

                let version_id = if let Some(pinned) = config.pinned_version {
                    let exists = db.find_version_of_resource(pinned).await?;
                    if !exists || db.is_disabled(pinned) {
                        failures[i] = Some(ResolveFailure::PinnedVersionNotFound { id: pinned });
                        continue 'slots;
                    }

                    debug!(depth, input = %config.name, version = %pinned, "using pinned version");
                    pinned
                } else if config.use_every_version {
                    match db.latest_build_id(config.job_id).await? {
                        Some(build_id) => {
                            match db.next_every_version(build_id, config.resource_id).await? {
                                Some(version_id) => {
                                    debug!(depth, input = %config.name, version = %version_id, "advancing to next version");
                                    version_id
                                },
                                None => {
                                    failures[i] = Some(ResolveFailure::VersionNotFound);
                                    continue 'slots;
                                },
                            }
                        },
                        None => match db.latest_version_of_resource(config.resource_id).await? {
                            Some(version_id) => version_id,
                            None => {
                                failures[i] = Some(ResolveFailure::LatestVersionNotFound);
                                continue 'slots;
                            },
                        },
                    }
                } else {
                    // No passed constraint; take the newest version.
                    match db.latest_version_of_resource(config.resource_id).await? {
                        Some(version_id) => {
                            debug!(depth, input = %config.name, version = %version_id, "using latest version");
                            version_id
                        },
                        None => {
                            failures[i] = Some(ResolveFailure::LatestVersionNotFound);
                            continue 'slots;
                        },
                    }
                };

                candidates[i] = Candidate::chosen(version_id, config);
                continue;
            }

            let ordered_jobs = db.order_passed_jobs(config.job_id, &config.passed).await?;

            for job_id in ordered_jobs {
                if candidates[i].version.is_some() && candidates[i].vouched_for_by.contains(job_id)
                {
                    // Already vouched for by this job in an outer frame.
                    debug!(depth, input = %config.name, job = %job_id, "already vouched");
                    continue;
                }

                // Candidate builds of this upstream job, newest first.
                let mut builds = Vec::new();
                if config.use_every_version {
                    if let Some(last_build) = db.latest_build_id(config.job_id).await? {
                        if let Some(constraint_build) =
                            db.latest_constraint_build_id(last_build, job_id).await?
                        {
                            builds = db.unused_builds(constraint_build, job_id).await?;
                        }
                    }
                }

                if builds.is_empty() {
                    builds = db.successful_builds(job_id).await?;
                }

                for build_id in builds {
                    let outputs = db.build_outputs(build_id).await?;

                    debug!(depth, input = %config.name, job = %job_id, build = %build_id, "trying build");

                    // Prior state of every slot this build mutates, keyed
                    // by slot index. Drained back into `candidates` on
                    // every exit path that abandons the build.
                    let mut restore: BTreeMap<usize, Candidate> = BTreeMap::new();
                    let mut mismatch = false;

                    'outputs: for output in &outputs {
                        for c in 0..candidates.len() {
                            if configs[c].resource_id != output.resource_id {
                                // Unrelated to this output.
                                continue;
                            }

                            if !configs[c].passed.contains(job_id) {
                                // This candidate is unaffected by the
                                // current job.
                                continue;
                            }

                            if db.is_disabled(output.version_id) {
                                mismatch = true;
                                break 'outputs;
                            }

                            if let Some(pinned) = configs[c].pinned_version {
                                if pinned != output.version_id {
                                    debug!(depth, slot = c, version = %output.version_id, "output conflicts with pin");
                                    mismatch = true;
                                    break 'outputs;
                                }
                            }

                            if let Some(version) = candidates[c].version {
                                if version != output.version_id {
                                    // Don't fail the whole resolution; an
                                    // older output set may still work.
                                    debug!(depth, slot = c, "version mismatch");
                                    mismatch = true;
                                    break 'outputs;
                                }
                            }

                            if !restore.contains_key(&c) {
                                restore.insert(c, candidates[c].clone());
                            }

                            if candidates[c].version.is_none() {
                                debug!(depth, slot = c, version = %output.version_id, "setting candidate");
                                candidates[c].version = Some(output.version_id);
                            }

                            candidates[c].vouched_for_by.insert(job_id);
                            candidates[c].source_build_ids.push(build_id);
                        }
                    }

                    let vouched = !mismatch
                        && candidates[i].version.is_some()
                        && candidates[i].vouched_for_by.contains(job_id);

                    if vouched {
                        if cancel.is_cancelled() {
                            restore_candidates(candidates, restore);
                            return Err(ResolveError::Cancelled);
                        }

                        debug!(depth, input = %config.name, "recursing");

                        match resolve_frame(
                            depth + 1,
                            db,
                            configs,
                            &mut *candidates,
                            &mut *failures,
                            cancel,
                        )
                        .await
                        {
                            Ok(true) => {
                                // A match for the rest of the inputs.
                                return Ok(true);
                            },
                            Ok(false) => {},
                            Err(err) => {
                                restore_candidates(candidates, restore);
                                return Err(err);
                            },
                        }
                    }

                    // Mismatch, or the recursion failed; undo this
                    // build's writes and try the next output set.
                    debug!(depth, input = %config.name, build = %build_id, "restoring");
                    restore_candidates(candidates, restore);
                }

                // Every build of this upstream job is exhausted without a
                // matching input set.
                debug!(depth, input = %config.name, job = %job_id, "builds exhausted");
                return Ok(false);
            }
        }

        // Reached the end of all inputs; all is well.
        Ok(true)
    })
}

fn restore_candidates(candidates: &mut [Candidate], restore: BTreeMap<usize, Candidate>) {
    for (slot, prior) in restore {
        candidates[slot] = prior;
    }
}
