//! The server-side per-client session record.
//!
//! Exactly one handler task mutates a `Session`; the monitor only observes
//! `transfer_in_progress`, through its own dedicated lock, so eviction
//! checks never contend with the handler's activity bookkeeping.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use protocol::{Response, ResponseCode};

/// Opaque handle identifying a registered session in the server's
/// registration table. Generated by [`crate::ServerContext::register`].
pub type SessionId = u64;

struct SessionInner {
    last_activity: Instant,
    commands: Vec<(Instant, String)>,
    bytes_sent: u64,
    bytes_received: u64,
}

/// Per-connection state tracked on the server side.
///
/// `last_activity` is monotonic (backed by [`Instant`]) so the idle-eviction
/// check in the monitor can never observe time moving backwards. The
/// `transfer_in_progress` flag lives behind its own mutex, separate from
/// the rest of the session's bookkeeping, so the monitor's read of it never
/// blocks on (or is blocked by) the handler's command-log writes.
pub struct Session {
    peer: SocketAddr,
    connect_time: SystemTime,
    inner: Mutex<SessionInner>,
    transfer_in_progress: Mutex<bool>,
    shutdown_handle: Mutex<Option<TcpStream>>,
}

impl Session {
    /// Creates a new session for a just-accepted connection.
    #[must_use]
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            connect_time: SystemTime::now(),
            inner: Mutex::new(SessionInner {
                last_activity: Instant::now(),
                commands: Vec::new(),
                bytes_sent: 0,
                bytes_received: 0,
            }),
            transfer_in_progress: Mutex::new(false),
            shutdown_handle: Mutex::new(None),
        }
    }

    /// Stores a clone of the connection's stream so the monitor can force
    /// it closed on idle eviction without sharing the handler's own handle.
    pub fn set_shutdown_handle(&self, stream: TcpStream) {
        *self
            .shutdown_handle
            .lock()
            .expect("shutdown handle lock poisoned") = Some(stream);
    }

    /// Sends a `221` carrying `text` to the stored socket, if one was
    /// registered, then shuts it down in both directions. The handler's
    /// blocking read then returns an error or EOF and the session unwinds
    /// on its own.
    fn close_with_goodbye(&self, text: &str) {
        let mut handle = self
            .shutdown_handle
            .lock()
            .expect("shutdown handle lock poisoned");
        if let Some(stream) = handle.as_mut() {
            let goodbye = Response::from(ResponseCode::Goodbye).with_text(text);
            let _ = stream.write_all(goodbye.render().as_bytes());
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Evicts this session for having sat idle past the server's timeout.
    pub fn evict(&self) {
        self.close_with_goodbye("idle timeout, closing connection");
    }

    /// Closes this session as part of an orderly server shutdown.
    pub fn close_for_shutdown(&self) {
        self.close_with_goodbye("server shutting down");
    }

    /// The connecting peer's address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Wall-clock time the connection was accepted.
    #[must_use]
    pub const fn connect_time(&self) -> SystemTime {
        self.connect_time
    }

    /// Updates `last_activity` to now. Called on every command and
    /// periodically during a long-running transfer.
    pub fn touch(&self) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.last_activity = Instant::now();
    }

    /// Appends a command to the session's issued-command log and touches
    /// `last_activity`.
    pub fn log_command(&self, command: &str) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.last_activity = Instant::now();
        inner.commands.push((Instant::now(), command.to_string()));
    }

    /// Accounts for bytes written to the peer on this session.
    pub fn add_bytes_sent(&self, n: u64) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.bytes_sent += n;
    }

    /// Accounts for bytes read from the peer on this session.
    pub fn add_bytes_received(&self, n: u64) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.bytes_received += n;
    }

    /// Time elapsed since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        let inner = self.inner.lock().expect("session lock poisoned");
        inner.last_activity.elapsed()
    }

    /// Number of commands issued so far on this session.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.inner.lock().expect("session lock poisoned").commands.len()
    }

    /// Bytes sent / received accounted so far.
    #[must_use]
    pub fn byte_counts(&self) -> (u64, u64) {
        let inner = self.inner.lock().expect("session lock poisoned");
        (inner.bytes_sent, inner.bytes_received)
    }

    /// Marks whether a `GET`/`PUT` transfer body is currently in flight.
    /// While true, the monitor must not evict this session regardless of
    /// idle duration.
    pub fn set_transfer_in_progress(&self, in_progress: bool) {
        *self
            .transfer_in_progress
            .lock()
            .expect("transfer lock poisoned") = in_progress;
    }

    /// Whether a transfer body is currently in flight.
    #[must_use]
    pub fn is_transfer_in_progress(&self) -> bool {
        *self
            .transfer_in_progress
            .lock()
            .expect("transfer lock poisoned")
    }
}
