//! # beanq-core
//!
//! Connection-handling core of the beanq job-queue broker.
//!
//! This crate contains:
//! - **Protocol types**: `Command`, `CommandKind`, `Reply`
//! - **Codec**: `ProtocolCodec` for mixed line/body framing via `tokio_util`
//! - **Dispatch**: `Dispatcher` turning command lines into actions and replies
//! - **Connection**: the per-connection `WantCommand → Send* → Close` state machine
//! - **Server**: `Server`, one task per accepted TCP connection
//! - **Stats**: `StatsRegistry`, the shared counters behind `stats`
//! - **Store**: the `JobStore` seam and its placeholder `DiscardStore`
//! - **Error**: `BeanqError` and `CommandError`, `thiserror`-based

pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod protocol;
pub mod server;
pub mod stats;
pub mod store;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{DEFAULT_MAX_LINE_LEN, Frame, ProtocolCodec};
pub use connection::{ConnState, Connection};
pub use dispatch::{Action, DEFAULT_MAX_JOB_SIZE, Dispatcher, Limits};
pub use error::{BeanqError, CommandError};
pub use job::{Job, JobId, MIN_TTR, PutRequest};
pub use protocol::{Command, CommandKind, Reply};
pub use server::{DEFAULT_LISTEN_ADDR, Server};
pub use stats::{Counters, StatsRegistry};
pub use store::{DiscardStore, JobStore, PLACEHOLDER_JOB_ID, StatsSnapshot};
