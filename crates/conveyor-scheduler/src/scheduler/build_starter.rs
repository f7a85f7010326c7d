//! Pending-build gate.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::Job;

/// Create a pending build when a triggering input just appeared.
///
/// Reads the job's persisted full next build inputs; if none are
/// available this is a no-op. Otherwise the first declared input with
/// `trigger = true` whose mapped version is a first occurrence requests a
/// pending build, and one request suffices even when several inputs are
/// first occurrences. Without any triggering first occurrence the job
/// only runs when otherwise requested.
pub async fn ensure_pending_build_exists(job: &dyn Job) -> anyhow::Result<()> {
    let Some(build_inputs) = job.get_full_next_build_inputs().await? else {
        debug!(job = %job.name(), "next build inputs not found");
        return Ok(());
    };

    let by_name: HashMap<&str, _> = build_inputs
        .iter()
        .map(|input| (input.name.as_str(), input))
        .collect();

    for declared in job.inputs() {
        if !declared.trigger {
            continue;
        }

        let Some(input) = by_name.get(declared.name.as_str()) else {
            continue;
        };

        if input.first_occurrence {
            info!(
                job = %job.name(),
                input = %declared.name,
                version = %input.version_id,
                "new triggering input, ensuring pending build"
            );
            job.ensure_pending_build_exists().await?;
            break;
        }
    }

    Ok(())
}
