//! Line assembly over a byte stream
//!
//! Bytes arrive one at a time from an external source and accumulate into a
//! single pending line. Only printable ASCII is kept. A line feed completes the
//! line; until the caller takes it, further bytes are dropped rather than
//! appended or queued. A line that outgrows the length limit is discarded
//! whole at its line feed, never handed on truncated.

use crate::Error;
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

/// Default upper bound on a single pending line, in bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 8 * 1024;

/// Single-slot accumulator turning a byte stream into discrete lines
#[derive(Debug)]
pub struct LineAssembler {
    /// Bytes collected since the last line boundary
    line: BytesMut,

    /// Set when a line feed completed `line` and it has not been taken yet
    ready: bool,

    /// Lines longer than this are discarded
    max_len: usize,

    /// Set once the line in progress has lost bytes to `max_len`
    overflowed: bool,

    /// Bytes discarded because the slot was full or the line too long
    dropped: u64,

    /// Overlong lines discarded at their line feed
    rejected: u64,
}

impl LineAssembler {
    /// Create an assembler with the default line length limit
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create an assembler that keeps at most `max_len` bytes of a line
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            line: BytesMut::with_capacity(max_len.min(DEFAULT_MAX_LINE_LEN)),
            ready: false,
            max_len,
            overflowed: false,
            dropped: 0,
            rejected: 0,
        }
    }

    /// Feed one byte. Returns `true` if this byte completed a line.
    ///
    /// Printable ASCII (space through `~`) is appended; CR and every other
    /// byte are ignored. While a completed line is waiting to be taken, every
    /// byte is dropped. A line feed ending an overlong line discards it and
    /// returns `false`.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.ready {
            self.dropped += 1;
            return false;
        }

        match byte {
            b'\n' if self.overflowed => {
                self.reject();
                false
            }
            b'\n' => {
                self.ready = true;
                true
            }
            b' '..=b'~' if self.line.len() >= self.max_len => {
                self.dropped += 1;
                self.overflowed = true;
                false
            }
            b' '..=b'~' => {
                self.line.extend_from_slice(&[byte]);
                false
            }
            _ => false,
        }
    }

    fn reject(&mut self) {
        warn!(
            max_len = self.max_len,
            dropped = self.dropped,
            "line exceeds maximum length, discarding it"
        );
        self.line.clear();
        self.overflowed = false;
        self.rejected += 1;
    }

    /// Whether a completed line is waiting
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Take the completed line and reopen the slot.
    ///
    /// Returns `None` while the current line is still incomplete.
    pub fn take_line(&mut self) -> Option<String> {
        if !self.ready {
            return None;
        }
        let raw = self.line.split();
        self.ready = false;
        Some(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Bytes accumulated for the line in progress
    pub fn pending_len(&self) -> usize {
        self.line.len()
    }

    /// Total bytes dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Overlong lines discarded so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Framing adapter: each decoded item is one completed line.
///
/// Lines are taken as soon as they complete, so nothing is dropped for a full
/// slot in this mode; back-pressure is left to the consumer of the frames.
/// Overlong lines are skipped.
impl Decoder for LineAssembler {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.ready {
            return Ok(self.take_line());
        }

        let mut consumed = src.len();
        for (i, &byte) in src.iter().enumerate() {
            if self.push(byte) {
                consumed = i + 1;
                break;
            }
        }
        src.advance(consumed);

        Ok(self.take_line())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if !self.line.is_empty() {
            debug!(
                pending = self.line.len(),
                "stream ended with an unterminated line, discarding"
            );
            self.line.clear();
        }
        self.overflowed = false;
        Ok(None)
    }
}
