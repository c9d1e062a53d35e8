//! Process-wide state shared across every accepted connection.
//!
//! `ServerContext` owns the three locks the daemon coordinates around: the
//! session registration table (membership only — snapshot a copy under the
//! lock, then operate on the copy), the stats counters (see [`crate::stats`]),
//! and, per-session, the transfer-in-progress flag owned by each
//! [`Session`] itself. None of these locks is ever held across blocking I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::session::{Session, SessionId};
use crate::stats::ServerStats;

/// Shared, process-lifetime state: the working directory transfers are
/// confined to, the running flag the accept loop and monitor poll, the
/// session registration table, and the aggregated [`ServerStats`].
pub struct ServerContext {
    working_dir: PathBuf,
    start_time: SystemTime,
    running: AtomicBool,
    next_session_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    stats: ServerStats,
}

impl ServerContext {
    /// Creates a new context rooted at `working_dir`. The directory is not
    /// validated here; callers should confirm it exists before starting
    /// the accept loop.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            start_time: SystemTime::now(),
            running: AtomicBool::new(true),
            next_session_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
            stats: ServerStats::new(),
        }
    }

    /// The directory all `LIST`/`GET`/`PUT`/`DEL` paths are confined to.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// When the server process started, for `STAT`'s uptime field.
    #[must_use]
    pub const fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Whether the accept loop should keep running. Polled by the accept
    /// loop between blocking-with-timeout `accept` calls and by the
    /// monitor between eviction sweeps.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signals the accept loop and monitor to stop at their next poll.
    pub fn shut_down(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Aggregated counters for `STAT` responses.
    #[must_use]
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Registers a newly accepted connection and returns its id and shared
    /// handle. The handle is cloned into the handler thread; the table
    /// keeps its own clone so the monitor can enumerate sessions without
    /// synchronizing with the handler beyond this lock.
    pub fn register(&self, session: Session) -> (SessionId, Arc<Session>) {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(session);
        self.sessions
            .lock()
            .expect("session table lock poisoned")
            .insert(id, Arc::clone(&session));
        self.stats.record_connection();
        (id, session)
    }

    /// Removes a session from the table, e.g. on disconnect or eviction.
    pub fn deregister(&self, id: SessionId) {
        self.sessions
            .lock()
            .expect("session table lock poisoned")
            .remove(&id);
    }

    /// Returns a snapshot copy of every registered session, taken under
    /// the table lock and then released — the monitor inspects each
    /// session's own idle timer and transfer flag without holding this
    /// lock any longer than the copy itself takes.
    #[must_use]
    pub fn session_snapshot(&self) -> Vec<(SessionId, Arc<Session>)> {
        self.sessions
            .lock()
            .expect("session table lock poisoned")
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect()
    }

    /// Number of currently registered sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session table lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4321)
    }

    #[test]
    fn register_and_deregister_track_session_count() {
        let ctx = ServerContext::new("/tmp");
        assert_eq!(ctx.session_count(), 0);
        let (id, _session) = ctx.register(Session::new(test_addr()));
        assert_eq!(ctx.session_count(), 1);
        ctx.deregister(id);
        assert_eq!(ctx.session_count(), 0);
    }

    #[test]
    fn registering_bumps_connection_stat() {
        let ctx = ServerContext::new("/tmp");
        ctx.register(Session::new(test_addr()));
        ctx.register(Session::new(test_addr()));
        assert_eq!(ctx.stats().snapshot().connections, 2);
    }

    #[test]
    fn snapshot_reflects_registered_sessions_independent_of_table() {
        let ctx = ServerContext::new("/tmp");
        let (id, session) = ctx.register(Session::new(test_addr()));
        let snap = ctx.session_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0, id);
        assert_eq!(snap[0].1.peer_addr(), session.peer_addr());
    }

    #[test]
    fn shut_down_flips_running_flag() {
        let ctx = ServerContext::new("/tmp");
        assert!(ctx.is_running());
        ctx.shut_down();
        assert!(!ctx.is_running());
    }

    #[test]
    fn session_ids_are_distinct() {
        let ctx = ServerContext::new("/tmp");
        let (first, _) = ctx.register(Session::new(test_addr()));
        let (second, _) = ctx.register(Session::new(test_addr()));
        assert_ne!(first, second);
    }
}
