//! The five error kinds the service distinguishes (transport, protocol,
//! resource, I/O-during-transfer, internal), mapped to response codes and
//! diagnostics by `daemon` and `client` respectively.

use std::io;

use protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while resolving a requested resource (file, directory) on
/// the server's working directory.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The named file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),
    /// The named path is a directory, not a file.
    #[error("{0} is a directory")]
    IsDirectory(String),
    /// A `PUT` target already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// The filesystem denied the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The filename contains a path separator or a `..` component.
    #[error("invalid filename: {0}")]
    InvalidName(String),
}

/// Top-level error type shared by the daemon and client.
///
/// Each variant corresponds to one of the error kinds in the spec: (a)
/// Transport, (b) Protocol, (c) Resource, (d) I/O-during-transfer, (e)
/// Internal. Keeping them distinct lets callers apply the right
/// propagation policy (see each variant's doc) instead of lumping every
/// failure into one catch-all.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Peer reset, timeout, or unexpected EOF. Fatal to the connection.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// Missing argument, unknown verb, or malformed sequencing. The
    /// session remains usable after this is reported.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// File missing, a directory where a file was expected, a name
    /// collision, or a permission error. The session remains usable.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A read/write failure while a transfer body was in flight. The
    /// caller must clean up any partial `.part` file before propagating.
    #[error("I/O error during transfer: {0}")]
    TransferIo(#[source] io::Error),

    /// An unexpected internal failure; the affected session is dropped.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wraps an I/O error encountered outside of a transfer body.
    #[must_use]
    pub fn transport(err: io::Error) -> Self {
        Self::Transport(err)
    }

    /// Wraps an I/O error encountered while streaming a file body.
    #[must_use]
    pub fn transfer_io(err: io::Error) -> Self {
        Self::TransferIo(err)
    }

    /// True for a transport or transfer-I/O error caused by a read
    /// deadline expiring rather than a real connection failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(err) | Self::TransferIo(err) => {
                matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_error_converts_via_from() {
        let err: CoreError = ResourceError::NotFound("a.bin".into()).into();
        assert!(matches!(err, CoreError::Resource(ResourceError::NotFound(_))));
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err: CoreError = ProtocolError::CommandTooLarge { limit: 64 }.into();
        assert_eq!(
            err.to_string(),
            "protocol error: command line exceeded 64 bytes"
        );
    }

    #[test]
    fn is_timeout_detects_timed_out_transport_errors() {
        let err = CoreError::transport(io::Error::new(io::ErrorKind::TimedOut, "deadline"));
        assert!(err.is_timeout());
        let err = CoreError::transfer_io(io::Error::new(io::ErrorKind::WouldBlock, "deadline"));
        assert!(err.is_timeout());
        let err: CoreError = ProtocolError::CommandTooLarge { limit: 1 }.into();
        assert!(!err.is_timeout());
    }
}
