//! Framing for the mixed text/binary protocol.
//!
//! Commands are LF-terminated lines; a `put` line is followed by a body of
//! a length the line declares. The connection tells the codec what to
//! expect next with [`ProtocolCodec::expect_body`] or
//! [`ProtocolCodec::discard`], and the codec returns to line mode after
//! yielding the matching frame.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BeanqError;
use crate::protocol::Reply;

/// Default cap on a command line, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 224;

/// A unit of input produced by [`ProtocolCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A command line without its `\n` or `\r\n` terminator.
    Line(Bytes),
    /// Exactly the number of body bytes requested.
    Body(Bytes),
    /// The requested number of bytes has been skipped.
    Discarded,
    /// A line exceeded the length cap. The rest of it is skipped.
    Oversized,
    /// The stream ended in the middle of a body.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Line,
    /// Dropping input up to and including the next LF.
    SkipLine,
    Body(usize),
    Discard(usize),
}

/// Decoder/encoder pair for a single connection.
#[derive(Debug)]
pub struct ProtocolCodec {
    mode: Mode,
    max_line_len: usize,
    /// Bytes of the current buffer already scanned for LF.
    scanned: usize,
}

impl ProtocolCodec {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            mode: Mode::Line,
            max_line_len: max_line_len.max(1),
            scanned: 0,
        }
    }

    /// Make the next frame a [`Frame::Body`] of exactly `len` bytes.
    pub fn expect_body(&mut self, len: usize) {
        self.mode = Mode::Body(len);
    }

    /// Skip the next `len` bytes, then yield [`Frame::Discarded`].
    pub fn discard(&mut self, len: usize) {
        self.mode = Mode::Discard(len);
    }

    fn decode_line(&mut self, src: &mut BytesMut) -> Option<Frame> {
        let window = src.len().min(self.max_line_len);
        let found = src
            .get(self.scanned..window)
            .and_then(|tail| tail.iter().position(|b| *b == b'\n'));

        match found {
            Some(offset) => {
                let end = self.scanned + offset;
                self.scanned = 0;
                let mut line = src.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                Some(Frame::Line(line.freeze()))
            }
            None if src.len() >= self.max_line_len => {
                self.scanned = 0;
                if !Self::skip_line(src) {
                    self.mode = Mode::SkipLine;
                }
                Some(Frame::Oversized)
            }
            None => {
                self.scanned = window;
                None
            }
        }
    }

    /// Drop bytes through the next LF. Returns `true` once it was found.
    fn skip_line(src: &mut BytesMut) -> bool {
        match src.iter().position(|b| *b == b'\n') {
            Some(idx) => {
                src.advance(idx + 1);
                true
            }
            None => {
                src.clear();
                false
            }
        }
    }
}

impl Default for ProtocolCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl Decoder for ProtocolCodec {
    type Item = Frame;
    type Error = BeanqError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.mode {
                Mode::Line => return Ok(self.decode_line(src)),
                Mode::SkipLine => {
                    if !Self::skip_line(src) {
                        return Ok(None);
                    }
                    self.mode = Mode::Line;
                }
                Mode::Body(len) => {
                    if src.len() < len {
                        src.reserve(len - src.len());
                        return Ok(None);
                    }
                    self.mode = Mode::Line;
                    return Ok(Some(Frame::Body(src.split_to(len).freeze())));
                }
                Mode::Discard(remaining) => {
                    let n = remaining.min(src.len());
                    src.advance(n);
                    if n < remaining {
                        self.mode = Mode::Discard(remaining - n);
                        return Ok(None);
                    }
                    self.mode = Mode::Line;
                    return Ok(Some(Frame::Discarded));
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match self.mode {
            Mode::Body(_) | Mode::Discard(_) => {
                src.clear();
                self.mode = Mode::Line;
                Ok(Some(Frame::Truncated))
            }
            // A partial command line at EOF is never answered.
            Mode::Line | Mode::SkipLine => {
                src.clear();
                self.scanned = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Reply> for ProtocolCodec {
    type Error = BeanqError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(bytes: &[u8]) -> BytesMut {
        BytesMut::from(bytes)
    }

    fn line(bytes: &'static [u8]) -> Frame {
        Frame::Line(Bytes::from_static(bytes))
    }

    #[test]
    fn decodes_crlf_and_lf_lines() {
        let mut codec = ProtocolCodec::default();
        let mut src = buf(b"stats\r\nuse foo\nquit");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"stats")));
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"use foo")));
        assert_eq!(codec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"quit")));
        assert!(src.is_empty());
    }

    #[test]
    fn line_split_across_reads() {
        let mut codec = ProtocolCodec::default();
        let mut src = buf(b"pu");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"t 1 0 5 5");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"put 1 0 5 5")));
    }

    #[test]
    fn body_follows_line() {
        let mut codec = ProtocolCodec::default();
        let mut src = buf(b"put 1 0 5 5\r\nhel");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"put 1 0 5 5")));

        codec.expect_body(7);
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"lo\r\nstats\r\n");
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Frame::Body(Bytes::from_static(b"hello\r\n")))
        );
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"stats")));
    }

    #[test]
    fn body_may_contain_newlines() {
        let mut codec = ProtocolCodec::default();
        codec.expect_body(6);
        let mut src = buf(b"a\nb\r\n\r\n");
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Frame::Body(Bytes::from_static(b"a\nb\r\n\r")))
        );
    }

    #[test]
    fn truncated_body_at_eof() {
        let mut codec = ProtocolCodec::default();
        codec.expect_body(7);
        let mut src = buf(b"hel");
        assert_eq!(codec.decode_eof(&mut src).unwrap(), Some(Frame::Truncated));
        assert!(src.is_empty());
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn discard_skips_across_reads() {
        let mut codec = ProtocolCodec::default();
        codec.discard(10);
        let mut src = buf(b"0123");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());
        src.extend_from_slice(b"456789stats\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Frame::Discarded));
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"stats")));
    }

    #[test]
    fn oversized_line_is_skipped() {
        let mut codec = ProtocolCodec::new(8);
        let mut src = buf(b"use abcdefgh");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Frame::Oversized));
        src.extend_from_slice(b"ijk\r\nquit\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"quit")));
    }

    #[test]
    fn oversized_line_already_buffered() {
        let mut codec = ProtocolCodec::new(8);
        let mut src = buf(b"use abcdefgh\r\nstats\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Frame::Oversized));
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"stats")));
    }

    #[test]
    fn line_at_cap_is_accepted() {
        let mut codec = ProtocolCodec::new(7);
        let mut src = buf(b"stats\r\n");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(line(b"stats")));
    }

    #[test]
    fn partial_line_at_eof_is_dropped() {
        let mut codec = ProtocolCodec::default();
        let mut src = buf(b"sta");
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn encodes_replies() {
        let mut codec = ProtocolCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Reply::Inserted(1), &mut dst).unwrap();
        codec.encode(Reply::UnknownCommand, &mut dst).unwrap();
        assert_eq!(&dst[..], b"INSERTED 1\r\nUNKNOWN_COMMAND\r\n");
    }
}
