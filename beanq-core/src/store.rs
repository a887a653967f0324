//! The seam between connection handling and job storage.
//!
//! Ready queues, delay scheduling and reservations live behind
//! [`JobStore`]. The core only hands over validated jobs and asks for the
//! per-state job counts shown by `stats`.

use async_trait::async_trait;
use tracing::trace;

use crate::job::{Job, JobId};

/// Placeholder identifier returned while no real allocator exists.
pub const PLACEHOLDER_JOB_ID: JobId = 1;

/// Job counts by state, as reported on the `current-jobs-*` lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub urgent: u64,
    pub ready: u64,
    pub reserved: u64,
    pub delayed: u64,
    pub buried: u64,
}

/// Storage for accepted jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Take ownership of a validated job and return its identifier.
    async fn enqueue(&self, job: Job) -> JobId;

    /// Current job counts by state.
    fn current_stats(&self) -> StatsSnapshot;
}

// ── DiscardStore ─────────────────────────────────────────────────

/// A store that keeps nothing.
///
/// Every job is dropped and answered with [`PLACEHOLDER_JOB_ID`]; all
/// job-state counts stay at zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardStore;

#[async_trait]
impl JobStore for DiscardStore {
    async fn enqueue(&self, job: Job) -> JobId {
        trace!(
            priority = job.priority(),
            delay = job.delay(),
            ttr = job.ttr(),
            size = job.body_size(),
            "discarding job"
        );
        PLACEHOLDER_JOB_ID
    }

    fn current_stats(&self) -> StatsSnapshot {
        StatsSnapshot::default()
    }
}
