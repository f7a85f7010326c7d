//! Ordered set of upstream job identifiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use conveyor_common::types::JobId;

/// A compact ordered set of job ids.
///
/// Used for "passed" constraints and for tracking which upstream jobs have
/// vouched for a candidate version. Membership and equality are hot paths
/// in the resolver; iteration is always in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSet(BTreeSet<JobId>);

impl JobSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Number of jobs in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set contains no jobs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Membership test.
    pub fn contains(&self, job_id: JobId) -> bool {
        self.0.contains(&job_id)
    }

    /// Insert a job id; returns true if it was not already present.
    pub fn insert(&mut self, job_id: JobId) -> bool {
        self.0.insert(job_id)
    }

    /// True when every job in `self` is also in `other`.
    pub fn is_subset(&self, other: &JobSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Iterate the job ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = JobId> + '_ {
        self.0.iter().copied()
    }

    /// Stable rendering for diagnostics, e.g. `{1, 4, 9}`.
    pub fn render(&self) -> String {
        let ids: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        format!("{{{}}}", ids.join(", "))
    }
}

impl std::fmt::Display for JobSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl FromIterator<JobId> for JobSet {
    fn from_iter<I: IntoIterator<Item = JobId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<JobId> for JobSet {
    fn extend<I: IntoIterator<Item = JobId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl From<Vec<i64>> for JobSet {
    fn from(ids: Vec<i64>) -> Self {
        ids.into_iter().map(JobId::from).collect()
    }
}
