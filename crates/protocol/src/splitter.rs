//! Framing sentinels and the chunk splitter.
//!
//! Sentinels are fixed ASCII lines that appear inline in an otherwise
//! unstructured byte stream to mark the boundaries of a binary file body.
//! [`Splitter`] implements the scanning contract: given an inbound chunk
//! and the sentinel currently being searched for, it locates the first
//! occurrence, yields the bytes before it, and carries over up to
//! `sentinel.len() - 1` trailing bytes so a sentinel split across two reads
//! is still found.

/// The three framing tokens, each terminated by CRLF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// `FILE_START\r\n` — precedes a file body in either direction.
    FileStart,
    /// `FILE_END\r\n` — follows a file body in either direction.
    FileEnd,
    /// `READY_FOR_FILE\r\n` — server grants permission to begin an upload body.
    ReadyForFile,
}

impl Sentinel {
    /// The exact byte sequence this sentinel matches on the wire.
    #[must_use]
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Self::FileStart => b"FILE_START\r\n",
            Self::FileEnd => b"FILE_END\r\n",
            Self::ReadyForFile => b"READY_FOR_FILE\r\n",
        }
    }

    /// The sentinel's text with the trailing CRLF stripped, as it reads
    /// once split out by a CRLF-line reader.
    #[must_use]
    pub const fn as_line(self) -> &'static str {
        match self {
            Self::FileStart => "FILE_START",
            Self::FileEnd => "FILE_END",
            Self::ReadyForFile => "READY_FOR_FILE",
        }
    }
}

/// Result of feeding one chunk into the [`Splitter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitterEvent {
    /// The sentinel was not found in the combined (carry + chunk) buffer.
    /// `safe` is everything that cannot possibly be a prefix of the
    /// sentinel and is therefore safe to emit on the current channel now;
    /// up to `sentinel.len() - 1` bytes are retained internally as carry.
    Pending {
        /// Bytes safe to emit immediately.
        safe: Vec<u8>,
    },
    /// The sentinel was found. `before` is everything preceding it (to be
    /// emitted on the current channel); `after` is everything following it
    /// in the same combined buffer, which the caller should recurse on
    /// against whatever sentinel applies to the new state.
    Found {
        /// Bytes preceding the sentinel.
        before: Vec<u8>,
        /// Bytes following the sentinel, not yet classified.
        after: Vec<u8>,
    },
}

/// Scans a stream of chunks for a sentinel, carrying a small buffer across
/// calls so a sentinel split over two reads is still recognized.
///
/// One `Splitter` instance is reused across the lifetime of a connection;
/// [`Splitter::reset`] clears the carry when starting a fresh scan for a
/// different sentinel (e.g. after a sentinel is found and the state
/// machine moves on).
#[derive(Clone, Debug, Default)]
pub struct Splitter {
    carry: Vec<u8>,
}

impl Splitter {
    /// Creates an empty splitter with no carried bytes.
    #[must_use]
    pub fn new() -> Self {
        Self { carry: Vec::new() }
    }

    /// Feeds the next chunk while searching for `sentinel`.
    pub fn feed(&mut self, sentinel: Sentinel, chunk: &[u8]) -> SplitterEvent {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);

        let needle = sentinel.bytes();
        if let Some(pos) = memchr::memmem::find(&buf, needle) {
            let after = buf.split_off(pos + needle.len());
            buf.truncate(pos);
            SplitterEvent::Found { before: buf, after }
        } else {
            let keep = (needle.len().saturating_sub(1)).min(buf.len());
            let split_at = buf.len() - keep;
            let safe = buf[..split_at].to_vec();
            self.carry = buf[split_at..].to_vec();
            SplitterEvent::Pending { safe }
        }
    }

    /// Clears any carried bytes. Call this when switching to scan for a
    /// different sentinel so stale carry bytes are not mistaken for a
    /// prefix of the new one.
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Bytes currently held back pending more input.
    #[must_use]
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }
}
