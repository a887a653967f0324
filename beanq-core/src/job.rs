//! The in-flight representation of a submitted job.

use bytes::Bytes;

/// Trailer every job body must end with.
pub const BODY_TRAILER: &[u8] = b"\r\n";

/// Lower bound applied to a submitted time-to-run.
///
/// The parsed field is in seconds but this floor is the raw value the
/// broker has always used (one second expressed in nanoseconds). It is
/// applied without conversion.
pub const MIN_TTR: u64 = 1_000_000_000;

/// Identifier handed back in `INSERTED <id>`.
pub type JobId = u64;

/// Header fields of a `put` command, before the body has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutRequest {
    pub priority: u32,
    pub delay: u32,
    pub ttr: u32,
    pub body_size: u32,
}

impl PutRequest {
    /// Number of bytes to read after the command line: the declared body
    /// plus its CR LF trailer.
    pub fn wire_len(&self) -> usize {
        (self.body_size as usize).saturating_add(BODY_TRAILER.len())
    }
}

/// A submitted job, scoped to a single `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    priority: u64,
    delay: u64,
    ttr: u64,
    body_size: u64,
    body: Bytes,
}

impl Job {
    /// Build a job from the parsed header and the captured body.
    ///
    /// `body` is the full capture, trailer included.
    pub fn new(req: PutRequest, body: Bytes) -> Self {
        Self {
            priority: u64::from(req.priority),
            delay: u64::from(req.delay),
            ttr: u64::from(req.ttr).max(MIN_TTR),
            body_size: u64::from(req.body_size),
            body,
        }
    }

    pub fn priority(&self) -> u64 {
        self.priority
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn ttr(&self) -> u64 {
        self.ttr
    }

    pub fn body_size(&self) -> u64 {
        self.body_size
    }

    /// The captured body including its trailer.
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// The body without its trailer.
    pub fn body(&self) -> &[u8] {
        self.body
            .strip_suffix(BODY_TRAILER)
            .unwrap_or(&self.body)
    }

    /// Whether the capture ends in CR LF. A job that fails this check must
    /// be discarded.
    pub fn has_trailer(&self) -> bool {
        self.body.ends_with(BODY_TRAILER)
    }
}

// ── Tests ────────────────────────────────────────────────────────
