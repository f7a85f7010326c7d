//! Postgres-backed version database snapshot.
//!
//! Implements the [`VersionsDb`] contract over the relational store. The
//! relevant tables:
//!
//! - `resources (id, pipeline_id, name, pinned_version_id)`
//! - `resource_versions (id, resource_id, check_order, enabled)`
//! - `builds (id, job_id, status)`
//! - `build_inputs (build_id, input_name, resource_id, version_id)`
//! - `build_outputs (build_id, resource_id, version_id)`
//!
//! One snapshot serves one resolution pass. The disabled-version set is
//! loaded up front so `is_disabled` is a lookup, not a round-trip; the
//! remaining queries go to the store and must observe a consistent
//! universe (the scheduler runs each pass inside a repeatable-read
//! span of the store). All list queries order newest first and break
//! ties by descending id.

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use conveyor_common::types::{BuildId, JobId, ResourceId, VersionId};

use crate::algorithm::{BuildOutput, JobSet, VersionsDb};

/// Snapshot over the Postgres store for one pipeline.
pub struct PostgresVersionsDb {
    pool: PgPool,
    pipeline_id: i64,
    disabled_version_ids: HashSet<VersionId>,
}

impl PostgresVersionsDb {
    /// Load a snapshot for the pipeline, fetching the disabled set.
    pub async fn load(pool: PgPool, pipeline_id: i64) -> anyhow::Result<Self> {
        let disabled: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT v.id
            FROM resource_versions v
            JOIN resources r ON r.id = v.resource_id
            WHERE r.pipeline_id = $1
              AND NOT v.enabled
            "#,
        )
        .bind(pipeline_id)
        .fetch_all(&pool)
        .await
        .context("failed to load disabled versions")?;

        Ok(Self {
            pool,
            pipeline_id,
            disabled_version_ids: disabled.into_iter().map(VersionId::from).collect(),
        })
    }

    /// The pipeline this snapshot is scoped to.
    pub fn pipeline_id(&self) -> i64 {
        self.pipeline_id
    }
}

#[async_trait]
impl VersionsDb for PostgresVersionsDb {
    fn is_disabled(&self, version_id: VersionId) -> bool {
        self.disabled_version_ids.contains(&version_id)
    }

    async fn latest_version_of_resource(
        &self,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM resource_versions
            WHERE resource_id = $1
              AND enabled
            ORDER BY check_order DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(resource_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query latest version")?;

        Ok(id.map(VersionId::from))
    }

    async fn find_version_of_resource(&self, version_id: VersionId) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM resource_versions WHERE id = $1)"#,
        )
        .bind(version_id.0)
        .fetch_one(&self.pool)
        .await
        .context("failed to probe version existence")?;

        Ok(exists)
    }

    async fn latest_build_id(&self, job_id: JobId) -> anyhow::Result<Option<BuildId>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT b.id
            FROM builds b
            WHERE b.job_id = $1
              AND EXISTS (SELECT 1 FROM build_inputs i WHERE i.build_id = b.id)
            ORDER BY b.id DESC
            LIMIT 1
            "#,
        )
        .bind(job_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query latest build")?;

        Ok(id.map(BuildId::from))
    }

    async fn next_every_version(
        &self,
        build_id: BuildId,
        resource_id: ResourceId,
    ) -> anyhow::Result<Option<VersionId>> {
        // The version the build consumed for this resource, if any.
        let used_order: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT v.check_order
            FROM build_inputs i
            JOIN resource_versions v ON v.id = i.version_id
            WHERE i.build_id = $1
              AND i.resource_id = $2
            ORDER BY v.check_order DESC
            LIMIT 1
            "#,
        )
        .bind(build_id.0)
        .bind(resource_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query consumed version")?;

        let Some(used_order) = used_order else {
            // The build did not use this resource; start from the newest.
            return self.latest_version_of_resource(resource_id).await;
        };

        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM resource_versions
            WHERE resource_id = $1
              AND enabled
              AND check_order > $2
            ORDER BY check_order ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(resource_id.0)
        .bind(used_order)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query next version")?;

        Ok(id.map(VersionId::from))
    }

    async fn latest_constraint_build_id(
        &self,
        build_id: BuildId,
        from_job_id: JobId,
    ) -> anyhow::Result<Option<BuildId>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT b.id
            FROM builds b
            WHERE b.job_id = $2
              AND EXISTS (
                SELECT 1
                FROM build_outputs o
                JOIN build_inputs i
                  ON i.resource_id = o.resource_id
                 AND i.version_id = o.version_id
                WHERE o.build_id = b.id
                  AND i.build_id = $1
              )
            ORDER BY b.id DESC
            LIMIT 1
            "#,
        )
        .bind(build_id.0)
        .bind(from_job_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query constraint build")?;

        Ok(id.map(BuildId::from))
    }

    async fn unused_builds(
        &self,
        after_build_id: BuildId,
        job_id: JobId,
    ) -> anyhow::Result<Vec<BuildId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM builds
            WHERE job_id = $1
              AND id > $2
              AND status = 'succeeded'
            ORDER BY id DESC
            "#,
        )
        .bind(job_id.0)
        .bind(after_build_id.0)
        .fetch_all(&self.pool)
        .await
        .context("failed to query unused builds")?;

        Ok(ids.into_iter().map(BuildId::from).collect())
    }

    async fn successful_builds(&self, job_id: JobId) -> anyhow::Result<Vec<BuildId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM builds
            WHERE job_id = $1
              AND status = 'succeeded'
            ORDER BY id DESC
            "#,
        )
        .bind(job_id.0)
        .fetch_all(&self.pool)
        .await
        .context("failed to query successful builds")?;

        Ok(ids.into_iter().map(BuildId::from).collect())
    }

    async fn build_outputs(&self, build_id: BuildId) -> anyhow::Result<Vec<BuildOutput>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT resource_id, version_id
            FROM build_outputs
            WHERE build_id = $1
            ORDER BY resource_id ASC, version_id ASC
            "#,
        )
        .bind(build_id.0)
        .fetch_all(&self.pool)
        .await
        .context("failed to query build outputs")?;

        Ok(rows
            .into_iter()
            .map(|(resource_id, version_id)| BuildOutput {
                resource_id: ResourceId(resource_id),
                version_id: VersionId(version_id),
            })
            .collect())
    }

    async fn order_passed_jobs(
        &self,
        _job_id: JobId,
        passed: &JobSet,
    ) -> anyhow::Result<Vec<JobId>> {
        let passed_ids: Vec<i64> = passed.iter().map(|id| id.0).collect();

        // Distinct output counts per upstream job; jobs with no builds
        // produce no row and sort first.
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT b.job_id, COUNT(DISTINCT (o.resource_id, o.version_id))
            FROM builds b
            LEFT JOIN build_outputs o ON o.build_id = b.id
            WHERE b.job_id = ANY($1)
            GROUP BY b.job_id
            "#,
        )
        .bind(&passed_ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to count upstream outputs")?;

        let counts: std::collections::HashMap<i64, i64> = rows.into_iter().collect();

        let mut ordered: Vec<JobId> = passed.iter().collect();
        ordered.sort_by_key(|job| (counts.get(&job.0).copied().unwrap_or(0), job.0));

        Ok(ordered)
    }
}
