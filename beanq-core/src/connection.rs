//! Per-connection protocol state machine.
//!
//! ```text
//!                 line read            reply flushed
//!  WantCommand ───────────────► SendWord ───────────┐
//!     ▲  │  │                                         │
//!     │  │  └───────────────► SendJob  ───────────────┤
//!     │  │ quit / EOF / error                        │
//!     │  ▼                                           │
//!     │ Close ◄──────────────── write error ─────────┤
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! A connection strictly alternates between reading one command and
//! writing its reply; input that arrives early stays buffered until the
//! reply has been flushed.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::{Frame, ProtocolCodec};
use crate::dispatch::{Action, Dispatcher};
use crate::error::BeanqError;
use crate::job::PutRequest;
use crate::protocol::Reply;
use crate::stats::StatsRegistry;

// ── ConnState ────────────────────────────────────────────────────

/// Where a connection is in its request/reply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    /// Waiting for a command line.
    #[default]
    WantCommand,
    /// A single-line reply is pending.
    SendWord,
    /// A reply with a payload (`OK <n>`) is pending.
    SendJob,
    /// Terminal: the socket is released and the task ends.
    Close,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WantCommand => write!(f, "WantCommand"),
            Self::SendWord => write!(f, "SendWord"),
            Self::SendJob => write!(f, "SendJob"),
            Self::Close => write!(f, "Close"),
        }
    }
}

// ── Connection ───────────────────────────────────────────────────

/// One client connection, owned by its handling task.
pub struct Connection<T> {
    framed: Framed<T, ProtocolCodec>,
    state: ConnState,
    dispatcher: Dispatcher,
    /// Last command line read, for logging.
    cmd: Bytes,
    reply: Option<Reply>,
    /// Header of the `put` whose body is being read.
    in_job: Option<PutRequest>,
    peer: String,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an accepted stream. Counts as an open connection until
    /// [`run`](Self::run) returns or the value is dropped.
    pub fn new(io: T, dispatcher: Dispatcher, peer: impl Into<String>) -> Self {
        let codec = ProtocolCodec::new(dispatcher.limits().max_line_len);
        dispatcher.stats().connection_opened();
        Self {
            framed: Framed::new(io, codec),
            state: ConnState::WantCommand,
            dispatcher,
            cmd: Bytes::new(),
            reply: None,
            in_job: None,
            peer: peer.into(),
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Drive the state machine until the connection closes.
    pub async fn run(mut self) {
        debug!(peer = %self.peer, "connection opened");
        while self.state != ConnState::Close {
            self.step().await;
        }
        // Dropping `self` releases the socket and the connection count.
    }

    /// Perform exactly one state's worth of work.
    pub async fn step(&mut self) {
        match self.state {
            ConnState::WantCommand => self.read_command().await,
            ConnState::SendWord | ConnState::SendJob => self.send_reply().await,
            ConnState::Close => {}
        }
    }

    async fn read_command(&mut self) {
        let frame = match self.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.state = ConnState::Close;
                return;
            }
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "read failed");
                self.state = ConnState::Close;
                return;
            }
        };

        match frame {
            Frame::Line(line) => {
                self.cmd = line;
                let action = self.dispatcher.dispatch(&self.cmd);
                self.apply(action).await;
            }
            Frame::Oversized => {
                debug!(peer = %self.peer, "command line too long");
                self.set_reply(Reply::BadFormat);
            }
            other => {
                debug!(peer = %self.peer, frame = ?other, "unexpected frame");
                self.state = ConnState::Close;
            }
        }
    }

    async fn apply(&mut self, action: Action) {
        match action {
            Action::Reply(reply) => self.set_reply(reply),
            Action::ReadBody(req) => {
                self.in_job = Some(req);
                self.read_body().await;
            }
            Action::DiscardBody { len } => {
                self.framed.codec_mut().discard(len);
                match self.next_frame().await {
                    Ok(Some(Frame::Discarded)) => self.set_reply(Reply::JobTooBig),
                    Ok(Some(Frame::Truncated)) => self.set_reply(Reply::BadFormat),
                    Ok(_) | Err(_) => self.state = ConnState::Close,
                }
            }
            Action::Close => self.state = ConnState::Close,
        }
    }

    /// Read the body of the pending `put` and finish it.
    async fn read_body(&mut self) {
        let Some(req) = self.in_job.take() else {
            return;
        };
        self.framed.codec_mut().expect_body(req.wire_len());

        match self.next_frame().await {
            Ok(Some(Frame::Body(body))) => {
                debug!(peer = %self.peer, len = body.len(), "job body");
                let reply = self.dispatcher.ingest(req, body).await;
                self.set_reply(reply);
            }
            // The peer stopped sending before the body was complete.
            Ok(Some(Frame::Truncated)) => self.set_reply(Reply::BadFormat),
            Ok(other) => {
                debug!(peer = %self.peer, frame = ?other, "body read ended");
                self.state = ConnState::Close;
            }
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "body read failed");
                self.state = ConnState::Close;
            }
        }
    }

    async fn send_reply(&mut self) {
        let Some(reply) = self.reply.take() else {
            self.state = ConnState::WantCommand;
            return;
        };
        debug!(peer = %self.peer, reply = %reply, "reply");

        match self.framed.send(reply).await {
            Ok(()) => self.state = ConnState::WantCommand,
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "write failed");
                self.state = ConnState::Close;
            }
        }
    }

    fn set_reply(&mut self, reply: Reply) {
        self.state = if reply.has_payload() {
            ConnState::SendJob
        } else {
            ConnState::SendWord
        };
        self.reply = Some(reply);
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, BeanqError> {
        self.framed.next().await.transpose()
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        self.stats().connection_closed();
        debug!(peer = %self.peer, "connection closed");
    }
}

impl<T> Connection<T> {
    fn stats(&self) -> &Arc<StatsRegistry> {
        self.dispatcher.stats()
    }
}

// ── Tests ────────────────────────────────────────────────────────
