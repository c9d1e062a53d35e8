//! The write half of the client's connection: sending commands and
//! streaming an upload body. The read half is owned by the reader thread
//! (see [`crate::reader`]).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use protocol::Sentinel;
use xfer_core::CoreError;

/// Upload bodies are streamed in chunks no larger than this.
const UPLOAD_CHUNK: usize = 8192;

/// Socket read timeout for generic request/response exchanges. A `GET`
/// body receive temporarily tightens this to a shorter stall-specific
/// deadline (see `crate::reader`) and restores it afterward.
pub(crate) const GENERAL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Connects to `addr` and returns the connection (for writing) plus a
    /// clone of the stream for the reader thread. Both clones share one
    /// read timeout, set here once.
    pub fn connect(addr: SocketAddr) -> Result<(Self, TcpStream), CoreError> {
        let stream = TcpStream::connect(addr).map_err(CoreError::transport)?;
        stream
            .set_read_timeout(Some(GENERAL_TIMEOUT))
            .map_err(CoreError::transport)?;
        let read_half = stream.try_clone().map_err(CoreError::transport)?;
        Ok((Self { stream }, read_half))
    }

    /// Clones the underlying socket for a handler that needs to write to
    /// the connection from outside the driver (the `Ctrl-C` handler).
    pub fn try_clone_stream(&self) -> Result<TcpStream, CoreError> {
        self.stream.try_clone().map_err(CoreError::transport)
    }

    /// Sends one command line, appending the CRLF terminator.
    pub fn send_command(&mut self, line: &str) -> Result<(), CoreError> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|()| self.stream.write_all(b"\r\n"))
            .map_err(CoreError::transport)
    }

    pub fn write_sentinel(&mut self, sentinel: Sentinel) -> Result<(), CoreError> {
        self.stream
            .write_all(sentinel.bytes())
            .map_err(CoreError::transport)
    }

    /// Streams `src` to the server in chunks of at most [`UPLOAD_CHUNK`]
    /// bytes. Returns the number of bytes sent.
    pub fn send_body(&mut self, src: &mut impl Read) -> Result<u64, CoreError> {
        let mut total = 0u64;
        let mut chunk = vec![0u8; UPLOAD_CHUNK];
        loop {
            let n = src.read(&mut chunk).map_err(CoreError::transfer_io)?;
            if n == 0 {
                return Ok(total);
            }
            self.stream
                .write_all(&chunk[..n])
                .map_err(CoreError::transfer_io)?;
            total += n as u64;
        }
    }
}
