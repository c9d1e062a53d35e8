//! Wire-level primitives for the single-channel file-transfer protocol.
//!
//! A single byte stream carries three kinds of data in-line: textual
//! responses, framing sentinels, and raw file bodies. This crate owns the
//! pieces that do not need a socket to reason about: the response-code
//! table, the sentinel constants, and the [`chunk splitter`](splitter)
//! that demultiplexes an arbitrary stream of byte chunks around those
//! sentinels.
//!
//! Because `FILE_END\r\n` is searched for *inside* the file body, a body
//! that happens to contain that exact byte sequence will be truncated
//! early. This is a known limitation of sentinel framing (as opposed to a
//! length-prefixed frame) and is preserved here rather than silently
//! patched — see the crate's `splitter` module for the scanning contract.

pub mod codes;
pub mod error;
pub mod response;
pub mod splitter;

pub use codes::ResponseCode;
pub use error::ProtocolError;
pub use response::Response;
pub use splitter::{Sentinel, Splitter, SplitterEvent};
