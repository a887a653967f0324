//! Command dispatcher.
//!
//! Turns a command line into an [`Action`] for the connection to carry
//! out, and finishes a `put` once its body has been read. The dispatcher
//! does no I/O of its own, so a `put` comes back as a request to read a
//! body and is completed by [`Dispatcher::ingest`].

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::codec::DEFAULT_MAX_LINE_LEN;
use crate::job::{Job, PutRequest};
use crate::protocol::{Command, CommandKind, Reply};
use crate::stats::StatsRegistry;
use crate::store::JobStore;

/// Default cap on a declared job body, in bytes.
pub const DEFAULT_MAX_JOB_SIZE: u32 = 65_535;

/// Per-connection input limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest body a `put` may declare.
    pub max_job_size: u32,
    /// Longest accepted command line, terminator included.
    pub max_line_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_job_size: DEFAULT_MAX_JOB_SIZE,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// What the connection must do after a command line was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send this reply, then wait for the next command.
    Reply(Reply),
    /// Read the job body, then hand it to [`Dispatcher::ingest`].
    ReadBody(PutRequest),
    /// Skip `len` bytes of oversized body, then reply `JOB_TOO_BIG`.
    DiscardBody { len: usize },
    /// Close the connection without replying.
    Close,
}

/// Shared handle used by every connection to execute commands.
#[derive(Clone)]
pub struct Dispatcher {
    stats: Arc<StatsRegistry>,
    store: Arc<dyn JobStore>,
    limits: Limits,
}

impl Dispatcher {
    pub fn new(stats: Arc<StatsRegistry>, store: Arc<dyn JobStore>, limits: Limits) -> Self {
        Self {
            stats,
            store,
            limits,
        }
    }

    pub fn stats(&self) -> &Arc<StatsRegistry> {
        &self.stats
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Classify and execute one command line (terminator removed).
    pub fn dispatch(&self, line: &Bytes) -> Action {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                debug!(command = %CommandKind::Put, error = %e, "malformed command");
                return Action::Reply(Reply::BadFormat);
            }
        };
        debug!(command = %command.kind(), "command");

        match command {
            Command::Put(req) if req.body_size > self.limits.max_job_size => {
                debug!(
                    size = req.body_size,
                    max = self.limits.max_job_size,
                    "job too big"
                );
                Action::DiscardBody {
                    len: req.wire_len(),
                }
            }
            Command::Put(req) => Action::ReadBody(req),
            Command::Stats => {
                self.stats.record(CommandKind::Stats);
                let report = self.stats.render(&self.store.current_stats());
                Action::Reply(Reply::Ok(Bytes::from(report)))
            }
            Command::Use(name) => {
                self.stats.record(CommandKind::Use);
                Action::Reply(Reply::Using(name))
            }
            Command::Quit => Action::Close,
            Command::Unknown => Action::Reply(Reply::UnknownCommand),
        }
    }

    /// Finish a `put` whose body has been read in full.
    ///
    /// `body` is the complete capture: the declared bytes plus the two
    /// trailer bytes.
    pub async fn ingest(&self, req: PutRequest, body: Bytes) -> Reply {
        let job = Job::new(req, body);
        if !job.has_trailer() {
            debug!(size = job.body_size(), "job body not CRLF-terminated");
            return Reply::ExpectedCrlf;
        }

        self.stats.record_job();
        let id = self.store.enqueue(job).await;
        Reply::Inserted(id)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stats", &self.stats)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────
