//! Protocol-level error type: malformed wire data, not transport failures.

use thiserror::Error;

/// Errors raised while parsing wire data that is not shaped the way the
/// protocol requires. Transport failures (peer reset, timeout, I/O errors)
/// are not represented here — those belong to the caller's I/O layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A response line did not start with a three-digit code followed by a space.
    #[error("malformed response line: {0:?}")]
    MalformedResponse(String),

    /// A command line exceeded the protocol's per-command size limit.
    #[error("command line exceeded {limit} bytes")]
    CommandTooLarge {
        /// The configured limit that was exceeded.
        limit: usize,
    },
}
