//! Command and reply types of the line protocol.
//!
//! Uses proper enums; parsing never panics on client input.
//!
//! ```text
//! put <pri> <delay> <ttr> <bytes>\r\n<body>\r\n   →  INSERTED <id>
//! stats\r\n                                       →  OK <n>\r\n<report>\r\n
//! use <name>\r\n                                  →  USING <name>
//! quit\r\n                                        →  (connection closed)
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CommandError;
use crate::job::{JobId, PutRequest};

const CMD_PUT: &[u8] = b"put ";
const CMD_STATS: &[u8] = b"stats";
const CMD_USE: &[u8] = b"use ";
const CMD_QUIT: &[u8] = b"quit";

const PUT_FIELDS: usize = 5;

// ── CommandKind ──────────────────────────────────────────────────

/// Which command a line names, decided by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Put,
    Stats,
    Use,
    Quit,
    Unknown,
}

impl CommandKind {
    /// Classify a command line (terminator already removed).
    ///
    /// Matching is by case-sensitive prefix, so `statsfoo` is a `stats`.
    pub fn classify(line: &[u8]) -> Self {
        if line.starts_with(CMD_PUT) {
            Self::Put
        } else if line.starts_with(CMD_STATS) {
            Self::Stats
        } else if line.starts_with(CMD_USE) {
            Self::Use
        } else if line.starts_with(CMD_QUIT) {
            Self::Quit
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Stats => "stats",
            Self::Use => "use",
            Self::Quit => "quit",
            Self::Unknown => "<unknown>",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Command ──────────────────────────────────────────────────────

/// A fully parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put(PutRequest),
    Stats,
    /// Select a tube. The name is the raw remainder of the line.
    Use(Bytes),
    Quit,
    Unknown,
}

impl Command {
    /// Parse one command line, terminator already removed.
    ///
    /// Only `put` validates its arguments; every other kind parses
    /// unconditionally.
    pub fn parse(line: &Bytes) -> Result<Self, CommandError> {
        match CommandKind::classify(line) {
            CommandKind::Put => parse_put(line).map(Self::Put),
            CommandKind::Stats => Ok(Self::Stats),
            CommandKind::Use => Ok(Self::Use(line.slice(CMD_USE.len()..))),
            CommandKind::Quit => Ok(Self::Quit),
            CommandKind::Unknown => Ok(Self::Unknown),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Put(_) => CommandKind::Put,
            Self::Stats => CommandKind::Stats,
            Self::Use(_) => CommandKind::Use,
            Self::Quit => CommandKind::Quit,
            Self::Unknown => CommandKind::Unknown,
        }
    }
}

fn parse_put(line: &[u8]) -> Result<PutRequest, CommandError> {
    let fields: Vec<&[u8]> = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    let [_, pri, delay, ttr, size] = fields.as_slice() else {
        return Err(CommandError::FieldCount {
            expected: PUT_FIELDS,
            actual: fields.len(),
        });
    };

    Ok(PutRequest {
        priority: parse_u32(pri, "priority")?,
        delay: parse_u32(delay, "delay")?,
        ttr: parse_u32(ttr, "ttr")?,
        body_size: parse_u32(size, "bytes")?,
    })
}

/// Strict unsigned decimal: no sign, no whitespace, must fit in `u32`.
fn parse_u32(field: &[u8], name: &'static str) -> Result<u32, CommandError> {
    let invalid = || CommandError::InvalidNumber { field: name };
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(field)
        .map_err(|_| invalid())?
        .parse::<u32>()
        .map_err(|_| invalid())
}

// ── Reply ────────────────────────────────────────────────────────

/// Everything the broker can say back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Inserted(JobId),
    Using(Bytes),
    /// `OK <n>` followed by an `n`-byte payload.
    Ok(Bytes),
    BadFormat,
    ExpectedCrlf,
    JobTooBig,
    UnknownCommand,
}

impl Reply {
    /// Whether the reply carries a payload after its status line.
    pub fn has_payload(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Append the exact wire form of the reply to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Self::Inserted(id) => {
                dst.put_slice(format!("INSERTED {id}\r\n").as_bytes());
            }
            Self::Using(name) => {
                dst.reserve(name.len() + 8);
                dst.put_slice(b"USING ");
                dst.put_slice(name);
                dst.put_slice(b"\r\n");
            }
            Self::Ok(payload) => {
                dst.put_slice(format!("OK {}\r\n", payload.len()).as_bytes());
                dst.reserve(payload.len() + 2);
                dst.put_slice(payload);
                dst.put_slice(b"\r\n");
            }
            Self::BadFormat => dst.put_slice(b"BAD_FORMAT\r\n"),
            Self::ExpectedCrlf => dst.put_slice(b"EXPECTED_CRLF\r\n"),
            Self::JobTooBig => dst.put_slice(b"JOB_TOO_BIG\r\n"),
            Self::UnknownCommand => dst.put_slice(b"UNKNOWN_COMMAND\r\n"),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted(id) => write!(f, "INSERTED {id}"),
            Self::Using(name) => write!(f, "USING {}", String::from_utf8_lossy(name)),
            Self::Ok(payload) => write!(f, "OK {}", payload.len()),
            Self::BadFormat => f.write_str("BAD_FORMAT"),
            Self::ExpectedCrlf => f.write_str("EXPECTED_CRLF"),
            Self::JobTooBig => f.write_str("JOB_TOO_BIG"),
            Self::UnknownCommand => f.write_str("UNKNOWN_COMMAND"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &'static [u8]) -> Result<Command, CommandError> {
        Command::parse(&Bytes::from_static(line))
    }

    fn wire(reply: Reply) -> Vec<u8> {
        let mut buf = BytesMut::new();
        reply.write_to(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn classify_by_prefix() {
        assert_eq!(CommandKind::classify(b"put 1 2 3 4"), CommandKind::Put);
        assert_eq!(CommandKind::classify(b"stats"), CommandKind::Stats);
        assert_eq!(CommandKind::classify(b"stats trailing"), CommandKind::Stats);
        assert_eq!(CommandKind::classify(b"use foo"), CommandKind::Use);
        assert_eq!(CommandKind::classify(b"quit"), CommandKind::Quit);
        assert_eq!(CommandKind::classify(b"bogus"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify(b"PUT 1 2 3 4"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify(b"put"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify(b"use"), CommandKind::Unknown);
        assert_eq!(CommandKind::classify(b""), CommandKind::Unknown);
    }

    #[test]
    fn parse_put_fields() {
        let cmd = parse(b"put 1 0 5 5").unwrap();
        assert_eq!(
            cmd,
            Command::Put(PutRequest {
                priority: 1,
                delay: 0,
                ttr: 5,
                body_size: 5,
            })
        );
        assert_eq!(cmd.kind(), CommandKind::Put);
    }

    #[test]
    fn parse_put_tolerates_repeated_whitespace() {
        assert!(matches!(parse(b"put  1 0\t5 5 "), Ok(Command::Put(_))));
    }

    #[test]
    fn parse_put_rejects_bad_fields() {
        assert_eq!(
            parse(b"put abc 0 5 5"),
            Err(CommandError::InvalidNumber { field: "priority" })
        );
        assert_eq!(
            parse(b"put 1 0 -5 5"),
            Err(CommandError::InvalidNumber { field: "ttr" })
        );
        assert_eq!(
            parse(b"put 1 0 5 +5"),
            Err(CommandError::InvalidNumber { field: "bytes" })
        );
        assert_eq!(
            parse(b"put 1 4294967296 5 5"),
            Err(CommandError::InvalidNumber { field: "delay" })
        );
        assert_eq!(
            parse(b"put 1 0 5"),
            Err(CommandError::FieldCount {
                expected: 5,
                actual: 4
            })
        );
        assert!(parse(b"put 1 0 5 5 6").is_err());
    }

    #[test]
    fn parse_use_keeps_name_verbatim() {
        assert_eq!(
            parse(b"use foo").unwrap(),
            Command::Use(Bytes::from_static(b"foo"))
        );
        assert_eq!(
            parse(b"use  two words").unwrap(),
            Command::Use(Bytes::from_static(b" two words"))
        );
    }

    #[test]
    fn reply_wire_format() {
        assert_eq!(wire(Reply::Inserted(1)), b"INSERTED 1\r\n");
        assert_eq!(
            wire(Reply::Using(Bytes::from_static(b"foo"))),
            b"USING foo\r\n"
        );
        assert_eq!(
            wire(Reply::Ok(Bytes::from_static(b"---\n"))),
            b"OK 4\r\n---\n\r\n"
        );
        assert_eq!(wire(Reply::BadFormat), b"BAD_FORMAT\r\n");
        assert_eq!(wire(Reply::ExpectedCrlf), b"EXPECTED_CRLF\r\n");
        assert_eq!(wire(Reply::JobTooBig), b"JOB_TOO_BIG\r\n");
        assert_eq!(wire(Reply::UnknownCommand), b"UNKNOWN_COMMAND\r\n");
    }

    #[test]
    fn reply_display() {
        assert_eq!(Reply::Inserted(7).to_string(), "INSERTED 7");
        assert_eq!(Reply::Ok(Bytes::from_static(b"abc")).to_string(), "OK 3");
        assert!(Reply::Ok(Bytes::new()).has_payload());
        assert!(!Reply::BadFormat.has_payload());
    }
}
