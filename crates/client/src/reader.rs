//! The client's reader thread: owns the read half of the connection and
//! implements the `EXPECT_TEXT` / `AWAIT_FILE_START` / `RECEIVING_FILE` /
//! `AWAIT_READY` state machine, forwarding parsed events to the driver.

use std::fs::File;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use protocol::{ProtocolError, Sentinel};
use xfer_core::{ClientStats, CoreError, FramedStream};

use crate::connection::GENERAL_TIMEOUT;

/// How long the reader waits for more detail lines after a response's
/// status line before deciding the response is complete.
const DETAIL_QUIET: Duration = Duration::from_millis(80);

/// A `GET` in progress is aborted if no further body bytes arrive within
/// this long, even though the connection itself is still up.
const STALL_TIMEOUT: Duration = Duration::from_secs(10);

/// How many detail lines a `150` is allowed to carry before its expected
/// sentinel; guards against a misbehaving peer never sending one.
const MAX_PRE_SENTINEL_LINES: usize = 16;

/// What the reader should do with the next sentinel-shaped line, set by
/// the driver immediately before it sends a command that might trigger one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// No command in flight that expects a sentinel; any response line is
    /// a plain text response.
    None,
    /// A `GET` was sent; `FILE_START` begins the download body, saved to `dest`.
    FileStart { dest: PathBuf },
    /// A `PUT` was sent; `READY_FOR_FILE` grants permission to upload.
    ReadyForUpload,
}

/// A parsed event surfaced to the driver.
#[derive(Clone, Debug)]
pub enum ClientEvent {
    /// A text response: status code, message, and any detail lines.
    Response {
        code: u16,
        text: String,
        details: Vec<String>,
    },
    /// A `GET` body was fully received and saved.
    Downloaded { dest: PathBuf, bytes: u64 },
    /// The server granted permission to begin a `PUT` body.
    ReadyForUpload,
    /// The connection closed (EOF) with no response pending.
    Disconnected,
    /// A transport or protocol failure occurred; the reader thread exits.
    Failed(String),
}

/// Shared handle the driver uses to tell the reader what the next sentinel
/// line (if any) means, and to receive parsed events back.
pub struct ReaderHandle {
    expectation: Arc<Mutex<Expectation>>,
    events: Receiver<ClientEvent>,
    join: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Tells the reader what the next sentinel-shaped line should be
    /// interpreted as. Call this immediately before sending the command
    /// that provokes it.
    pub fn set_expectation(&self, expectation: Expectation) {
        *self.expectation.lock().expect("expectation lock poisoned") = expectation;
    }

    /// Blocks for the next event.
    pub fn recv(&self) -> Option<ClientEvent> {
        self.events.recv().ok()
    }

    /// Blocks for the next event up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Joins the reader thread. Call after the connection is closed.
    pub fn join(&mut self) {
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the reader thread over `stream` (the read half; the driver keeps
/// its own clone for writing).
pub fn spawn(stream: TcpStream, stats: Arc<ClientStats>) -> ReaderHandle {
    let expectation = Arc::new(Mutex::new(Expectation::None));
    let (tx, rx) = mpsc::channel();
    let reader_expectation = Arc::clone(&expectation);
    let join = thread::spawn(move || run(stream, reader_expectation, stats, tx));
    ReaderHandle {
        expectation,
        events: rx,
        join: Some(join),
    }
}

fn run(
    stream: TcpStream,
    expectation: Arc<Mutex<Expectation>>,
    stats: Arc<ClientStats>,
    tx: Sender<ClientEvent>,
) {
    let mut framed = FramedStream::new(stream);
    loop {
        let line = match framed.read_line(8192) {
            Ok(Some(line)) => line,
            Ok(None) => {
                let _ = tx.send(ClientEvent::Disconnected);
                return;
            }
            Err(err) => {
                let _ = tx.send(ClientEvent::Failed(err.to_string()));
                return;
            }
        };

        let Some((code, text)) = parse_response(&line) else {
            *expectation.lock().expect("expectation lock poisoned") = Expectation::None;
            let err: CoreError = ProtocolError::MalformedResponse(line).into();
            let _ = tx.send(ClientEvent::Failed(err.to_string()));
            return;
        };
        if code >= 400 {
            stats.record_error();
        }

        // A `150` always precedes the sentinel it was announcing (`GET`'s
        // `FILE_START` or `PUT`'s `READY_FOR_FILE`); any detail lines sit
        // between the status line and that sentinel.
        if code == 150 {
            let current = expectation.lock().expect("expectation lock poisoned").clone();
            match current {
                Expectation::FileStart { dest } => {
                    let details = match collect_until_sentinel(&mut framed, Sentinel::FileStart) {
                        Ok(details) => details,
                        Err(err) => {
                            let _ = tx.send(ClientEvent::Failed(err.to_string()));
                            return;
                        }
                    };
                    if tx.send(ClientEvent::Response { code, text, details }).is_err() {
                        return;
                    }
                    if !download_body(&mut framed, dest, &expectation, &stats, &tx) {
                        return;
                    }
                }
                Expectation::ReadyForUpload => {
                    let details =
                        match collect_until_sentinel(&mut framed, Sentinel::ReadyForFile) {
                            Ok(details) => details,
                            Err(err) => {
                                let _ = tx.send(ClientEvent::Failed(err.to_string()));
                                return;
                            }
                        };
                    if tx.send(ClientEvent::Response { code, text, details }).is_err() {
                        return;
                    }
                    *expectation.lock().expect("expectation lock poisoned") = Expectation::None;
                    if tx.send(ClientEvent::ReadyForUpload).is_err() {
                        return;
                    }
                }
                Expectation::None => {
                    let details = framed.read_trailing_lines(DETAIL_QUIET).unwrap_or_default();
                    if tx.send(ClientEvent::Response { code, text, details }).is_err() {
                        return;
                    }
                }
            }
            continue;
        }

        *expectation.lock().expect("expectation lock poisoned") = Expectation::None;
        let details = framed.read_trailing_lines(DETAIL_QUIET).unwrap_or_default();
        if tx.send(ClientEvent::Response { code, text, details }).is_err() {
            return;
        }
    }
}

/// Reads lines until one matches `sentinel`'s text exactly, returning
/// everything read before it as detail lines. The sentinel line itself is
/// consumed but not returned — the caller already knows what it expected.
fn collect_until_sentinel(
    framed: &mut FramedStream,
    sentinel: Sentinel,
) -> Result<Vec<String>, CoreError> {
    let literal = sentinel.as_line();
    let mut details = Vec::new();
    loop {
        let line = framed.read_line(8192)?.ok_or_else(|| {
            CoreError::transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before expected sentinel",
            ))
        })?;
        if line == literal {
            return Ok(details);
        }
        if details.len() >= MAX_PRE_SENTINEL_LINES {
            return Err(ProtocolError::MalformedResponse(format!(
                "{literal} sentinel not seen after {MAX_PRE_SENTINEL_LINES} detail lines"
            ))
            .into());
        }
        details.push(line);
    }
}

/// Receives a `GET` body into `dest`, aborting if no bytes arrive within
/// [`STALL_TIMEOUT`]. Returns whether the reader loop should keep running.
fn download_body(
    framed: &mut FramedStream,
    dest: PathBuf,
    expectation: &Arc<Mutex<Expectation>>,
    stats: &ClientStats,
    tx: &Sender<ClientEvent>,
) -> bool {
    let mut file = match File::create(&dest) {
        Ok(file) => file,
        Err(err) => {
            *expectation.lock().expect("expectation lock poisoned") = Expectation::None;
            return tx
                .send(ClientEvent::Failed(CoreError::transfer_io(err).to_string()))
                .is_ok();
        }
    };

    if let Err(err) = framed.set_read_timeout(Some(STALL_TIMEOUT)) {
        *expectation.lock().expect("expectation lock poisoned") = Expectation::None;
        return tx.send(ClientEvent::Failed(err.to_string())).is_ok();
    }
    let result = framed.receive_body_timed(Sentinel::FileEnd, &mut file);
    let _ = framed.set_read_timeout(Some(GENERAL_TIMEOUT));
    *expectation.lock().expect("expectation lock poisoned") = Expectation::None;

    match result {
        Ok(bytes) => {
            stats.record_transfer(bytes, false);
            tx.send(ClientEvent::Downloaded { dest, bytes }).is_ok()
        }
        Err(err) => {
            stats.record_error();
            let message = if err.is_timeout() {
                format!("download stalled: no data received for {STALL_TIMEOUT:?}")
            } else {
                err.to_string()
            };
            tx.send(ClientEvent::Failed(message)).is_ok()
        }
    }
}

fn parse_response(line: &str) -> Option<(u16, String)> {
    let mut parts = line.splitn(2, ' ');
    let code = parts.next()?.parse().ok()?;
    let text = parts.next().unwrap_or_default().to_string();
    Some((code, text))
}
