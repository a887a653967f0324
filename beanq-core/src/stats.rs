//! Process-wide counters behind the `stats` command.
//!
//! One registry is built when the server binds and shared by every
//! connection task through an `Arc`. A single mutex guards all counters so
//! that [`StatsRegistry::snapshot`] always observes a consistent set.

use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::CommandKind;
use crate::store::StatsSnapshot;

/// A point-in-time copy of the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub cmd_put: u64,
    pub cmd_use: u64,
    pub cmd_stats: u64,
    pub total_jobs: u64,
    pub current_connections: i64,
}

/// Shared command and connection counters.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    inner: Mutex<Counters>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters are plain integers; a panic elsewhere cannot leave them
        // half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one successful dispatch of `kind`.
    ///
    /// Kinds without a counter (`quit`, unknown) are ignored.
    pub fn record(&self, kind: CommandKind) {
        let mut c = self.lock();
        match kind {
            CommandKind::Put => c.cmd_put += 1,
            CommandKind::Use => c.cmd_use += 1,
            CommandKind::Stats => c.cmd_stats += 1,
            CommandKind::Quit | CommandKind::Unknown => {}
        }
    }

    /// Count an accepted job: bumps both `cmd-put` and the job total.
    pub fn record_job(&self) {
        let mut c = self.lock();
        c.cmd_put += 1;
        c.total_jobs += 1;
    }

    pub fn connection_opened(&self) {
        self.lock().current_connections += 1;
    }

    pub fn connection_closed(&self) {
        self.lock().current_connections -= 1;
    }

    pub fn current_connections(&self) -> i64 {
        self.lock().current_connections
    }

    pub fn snapshot(&self) -> Counters {
        *self.lock()
    }

    /// Render the `stats` report body from one snapshot of the registry and
    /// the store's job counts.
    pub fn render(&self, jobs: &StatsSnapshot) -> String {
        render_report(&self.snapshot(), jobs)
    }
}

/// Format the report body. Every line, the last included, ends in LF.
pub fn render_report(c: &Counters, jobs: &StatsSnapshot) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("---\n");
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "current-jobs-urgent: {}\n\
         current-jobs-ready: {}\n\
         current-jobs-reserved: {}\n\
         current-jobs-delayed: {}\n\
         current-jobs-buried: {}\n\
         cmd-put: {}\n\
         cmd-use: {}\n\
         cmd-stats: {}\n\
         current-connections: {}\n",
        jobs.urgent,
        jobs.ready,
        jobs.reserved,
        jobs.delayed,
        jobs.buried,
        c.cmd_put,
        c.cmd_use,
        c.cmd_stats,
        c.current_connections,
    );
    out
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn record_by_kind() {
        let stats = StatsRegistry::new();
        stats.record(CommandKind::Use);
        stats.record(CommandKind::Use);
        stats.record(CommandKind::Stats);
        stats.record(CommandKind::Quit);
        stats.record(CommandKind::Unknown);

        let c = stats.snapshot();
        assert_eq!(c.cmd_use, 2);
        assert_eq!(c.cmd_stats, 1);
        assert_eq!(c.cmd_put, 0);
    }

    #[test]
    fn record_job_bumps_put_and_total() {
        let stats = StatsRegistry::new();
        stats.record_job();
        stats.record_job();
        let c = stats.snapshot();
        assert_eq!(c.cmd_put, 2);
        assert_eq!(c.total_jobs, 2);
    }

    #[test]
    fn connection_count_tracks_open_and_close() {
        let stats = StatsRegistry::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        assert_eq!(stats.current_connections(), 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let stats = Arc::new(StatsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.connection_opened();
                        stats.record_job();
                        stats.record(CommandKind::Use);
                        stats.connection_closed();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let c = stats.snapshot();
        assert_eq!(c.cmd_put, 8000);
        assert_eq!(c.total_jobs, 8000);
        assert_eq!(c.cmd_use, 8000);
        assert_eq!(c.current_connections, 0);
    }

    #[test]
    fn report_layout() {
        let c = Counters {
            cmd_put: 3,
            cmd_use: 2,
            cmd_stats: 1,
            total_jobs: 3,
            current_connections: 4,
        };
        let jobs = StatsSnapshot {
            ready: 7,
            ..Default::default()
        };
        assert_eq!(
            render_report(&c, &jobs),
            "---\n\
             current-jobs-urgent: 0\n\
             current-jobs-ready: 7\n\
             current-jobs-reserved: 0\n\
             current-jobs-delayed: 0\n\
             current-jobs-buried: 0\n\
             cmd-put: 3\n\
             cmd-use: 2\n\
             cmd-stats: 1\n\
             current-connections: 4\n"
        );
    }
}
