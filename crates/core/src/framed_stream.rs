//! A `TcpStream` wrapper that demultiplexes the mixed text/binary protocol
//! stream: one CRLF-terminated command or response line at a time, or a
//! sentinel-framed file body, sharing a single leftover-byte buffer so
//! nothing read ahead of a line boundary is ever lost.
//!
//! Shared by `daemon` (reading commands, streaming `GET` bodies, receiving
//! `PUT` bodies) and `client` (reading responses and sentinels on its
//! reader thread).

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use protocol::{ProtocolError, Response, Sentinel, Splitter, SplitterEvent};

use crate::error::CoreError;

const READ_CHUNK: usize = 8192;

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Wraps one side of a connection for framed reads; writes go straight to
/// the socket with no buffering beyond what `write_all` needs.
pub struct FramedStream {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl FramedStream {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    fn fill_more(&mut self) -> io::Result<bool> {
        let mut chunk = vec![0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    /// Reads one CRLF-terminated line, rejecting anything longer than
    /// `max_len` bytes before a terminator is found. Returns `Ok(None)` on
    /// a clean EOF with no partial data buffered.
    pub fn read_line(&mut self, max_len: usize) -> Result<Option<String>, CoreError> {
        loop {
            if let Some(pos) = self.buf.windows(2).position(|w| w == b"\r\n") {
                let rest = self.buf.split_off(pos + 2);
                let mut line = std::mem::replace(&mut self.buf, rest);
                line.truncate(pos);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.buf.len() > max_len {
                return Err(CoreError::Protocol(ProtocolError::CommandTooLarge {
                    limit: max_len,
                }));
            }
            match self.fill_more() {
                Ok(true) => continue,
                Ok(false) if self.buf.is_empty() => return Ok(None),
                Ok(false) => {
                    return Err(CoreError::transport(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed mid-line",
                    )))
                }
                Err(err) => return Err(CoreError::transport(err)),
            }
        }
    }

    /// Drains any additional CRLF-terminated lines that arrive within
    /// `quiet_for` of each other, stopping at the first gap. A response's
    /// detail lines are written by the peer in one `write_all` call, so in
    /// practice they arrive as a single read; this lets the client collect
    /// them without the wire format needing an explicit line count or
    /// terminator.
    pub fn read_trailing_lines(&mut self, quiet_for: Duration) -> Result<Vec<String>, CoreError> {
        let mut lines = Vec::new();
        loop {
            if let Some(pos) = self.buf.windows(2).position(|w| w == b"\r\n") {
                let rest = self.buf.split_off(pos + 2);
                let mut line = std::mem::replace(&mut self.buf, rest);
                line.truncate(pos);
                lines.push(String::from_utf8_lossy(&line).into_owned());
                continue;
            }
            self.stream
                .set_read_timeout(Some(quiet_for))
                .map_err(CoreError::transport)?;
            let filled = self.fill_more();
            self.stream
                .set_read_timeout(None)
                .map_err(CoreError::transport)?;
            match filled {
                Ok(true) => continue,
                Ok(false) => return Ok(lines),
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(lines)
                }
                Err(err) => return Err(CoreError::transport(err)),
            }
        }
    }

    pub fn write_sentinel(&mut self, sentinel: Sentinel) -> Result<(), CoreError> {
        self.stream
            .write_all(sentinel.bytes())
            .map_err(CoreError::transport)
    }

    pub fn write_response(&mut self, response: &Response) -> Result<(), CoreError> {
        self.stream
            .write_all(response.render().as_bytes())
            .map_err(CoreError::transport)
    }

    /// Sets (or clears) the socket's read timeout. Affects every clone of
    /// the underlying file description, so a reader thread working off a
    /// cloned `TcpStream` sees the same deadline.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), CoreError> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(CoreError::transport)
    }

    /// Scans forward until `sentinel` is seen, discarding everything
    /// before it as pre-body noise. Used where a sentinel marks the start
    /// of a body rather than its end, so there is nothing to keep. A read
    /// timeout is treated as "keep waiting", not an error, so this blocks
    /// until the sentinel arrives or the connection closes.
    pub fn skip_until_sentinel(&mut self, sentinel: Sentinel) -> Result<(), CoreError> {
        let mut splitter = Splitter::new();
        loop {
            let chunk = if self.buf.is_empty() {
                match self.fill_more() {
                    Ok(true) => std::mem::take(&mut self.buf),
                    Ok(false) => {
                        return Err(CoreError::transport(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed before expected sentinel",
                        )))
                    }
                    Err(err) if is_timeout_kind(err.kind()) => continue,
                    Err(err) => return Err(CoreError::transport(err)),
                }
            } else {
                std::mem::take(&mut self.buf)
            };

            match splitter.feed(sentinel, &chunk) {
                SplitterEvent::Pending { .. } => {}
                SplitterEvent::Found { after, .. } => {
                    self.buf = after;
                    return Ok(());
                }
            }
        }
    }

    /// Reads a file body terminated by `sentinel` (normally
    /// [`Sentinel::FileEnd`]) into `dest`, assuming any leading
    /// `FILE_START` has already been consumed by the caller. Returns the
    /// number of body bytes written.
    ///
    /// A read timeout is treated as "keep waiting" rather than a transfer
    /// error; the caller decides when to give up (see
    /// [`Self::receive_body_timed`]).
    pub fn receive_body(
        &mut self,
        sentinel: Sentinel,
        dest: &mut impl Write,
    ) -> Result<u64, CoreError> {
        self.receive_body_inner(sentinel, dest, false)
    }

    /// Like [`Self::receive_body`], but a read timeout aborts the
    /// transfer immediately instead of being retried. Pair with
    /// [`Self::set_read_timeout`] to bound how long a stalled transfer is
    /// tolerated.
    pub fn receive_body_timed(
        &mut self,
        sentinel: Sentinel,
        dest: &mut impl Write,
    ) -> Result<u64, CoreError> {
        self.receive_body_inner(sentinel, dest, true)
    }

    fn receive_body_inner(
        &mut self,
        sentinel: Sentinel,
        dest: &mut impl Write,
        abort_on_timeout: bool,
    ) -> Result<u64, CoreError> {
        let mut splitter = Splitter::new();
        let mut total = 0u64;
        loop {
            let chunk = if self.buf.is_empty() {
                match self.fill_more() {
                    Ok(true) => std::mem::take(&mut self.buf),
                    Ok(false) => {
                        return Err(CoreError::transfer_io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed mid-transfer",
                        )))
                    }
                    Err(err) if !abort_on_timeout && is_timeout_kind(err.kind()) => continue,
                    Err(err) => return Err(CoreError::transfer_io(err)),
                }
            } else {
                std::mem::take(&mut self.buf)
            };

            match splitter.feed(sentinel, &chunk) {
                SplitterEvent::Pending { safe } => {
                    dest.write_all(&safe).map_err(CoreError::transfer_io)?;
                    total += safe.len() as u64;
                }
                SplitterEvent::Found { before, after } => {
                    dest.write_all(&before).map_err(CoreError::transfer_io)?;
                    total += before.len() as u64;
                    self.buf = after;
                    return Ok(total);
                }
            }
        }
    }

    /// Streams `src` to the peer in `READ_CHUNK`-sized pieces. Returns the
    /// number of bytes sent.
    pub fn send_body(&mut self, src: &mut impl Read) -> Result<u64, CoreError> {
        let mut total = 0u64;
        let mut chunk = vec![0u8; READ_CHUNK];
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let client = thread::spawn(move || TcpStream::connect(addr).expect("connect"));
        let (server, _) = listener.accept().expect("accept");
        (server, client.join().expect("client thread"))
    }

    #[test]
    fn read_line_splits_on_crlf_and_preserves_trailing_bytes() {
        let (server, mut client) = connected_pair();
        client
            .write_all(b"LIST\r\nGET a.bin\r\n")
            .expect("write lines");
        let mut framed = FramedStream::new(server);
        assert_eq!(framed.read_line(1024).unwrap().as_deref(), Some("LIST"));
        assert_eq!(
            framed.read_line(1024).unwrap().as_deref(),
            Some("GET a.bin")
        );
    }

    #[test]
    fn read_line_returns_none_on_clean_eof() {
        let (server, client) = connected_pair();
        drop(client);
        let mut framed = FramedStream::new(server);
        assert_eq!(framed.read_line(1024).unwrap(), None);
    }

    #[test]
    fn read_line_rejects_an_oversized_command() {
        let (server, mut client) = connected_pair();
        client.write_all(&vec![b'x'; 2048]).expect("write");
        client.write_all(b"\r\n").expect("terminator");
        let mut framed = FramedStream::new(server);
        assert!(framed.read_line(64).is_err());
    }

    #[test]
    fn receive_body_stops_exactly_at_the_sentinel() {
        let (server, mut client) = connected_pair();
        client
            .write_all(b"hello world")
            .and_then(|()| client.write_all(Sentinel::FileEnd.bytes()))
            .and_then(|()| client.write_all(b"next command"))
            .expect("write body and trailer");
        let mut framed = FramedStream::new(server);
        let mut dest = Vec::new();
        let bytes = framed
            .receive_body(Sentinel::FileEnd, &mut dest)
            .expect("receive body");
        assert_eq!(bytes, 11);
        assert_eq!(dest, b"hello world");
        assert_eq!(
            framed.read_line(1024).unwrap().as_deref(),
            Some("next command")
        );
    }

    #[test]
    fn send_body_streams_every_byte() {
        let (server, client) = connected_pair();
        let payload = vec![7u8; 20_000];
        let mut framed = FramedStream::new(server);
        let mut src = std::io::Cursor::new(payload.clone());
        let sender = {
            let payload_len = payload.len();
            thread::spawn(move || {
                let bytes = framed.send_body(&mut src).expect("send body");
                assert_eq!(bytes, payload_len as u64);
            })
        };
        let mut received = vec![0u8; payload.len()];
        let mut client = client;
        client.read_exact(&mut received).expect("read all bytes");
        sender.join().expect("sender thread");
        assert_eq!(received, payload);
    }
}
