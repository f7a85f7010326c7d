//! Pipeline resource reads.

use anyhow::Context;
use sqlx::PgPool;

use conveyor_common::types::{ResourceId, VersionId};

use crate::models::{Resource, Resources};

/// Load the pipeline's resources with their current pinned versions.
///
/// Ordered by id so repeated loads render identically in diagnostics.
pub async fn load_resources(pool: &PgPool, pipeline_id: i64) -> anyhow::Result<Resources> {
    let rows: Vec<(i64, String, Option<i64>)> = sqlx::query_as(
        r#"
        SELECT id, name, pinned_version_id
        FROM resources
        WHERE pipeline_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(pipeline_id)
    .fetch_all(pool)
    .await
    .context("failed to load resources")?;

    Ok(rows
        .into_iter()
        .map(|(id, name, pinned)| Resource {
            id: ResourceId(id),
            name,
            pinned_version: pinned.map(VersionId::from),
        })
        .collect())
}
