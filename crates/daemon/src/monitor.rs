//! Idle-session eviction. Wakes periodically, snapshots the registration
//! table under its lock, then inspects each session's own idle timer and
//! transfer flag without holding that lock any longer than the copy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use xfer_core::ServerContext;

/// Sessions idle longer than this, and not mid-transfer, are evicted.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval between eviction sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

pub fn run(ctx: Arc<ServerContext>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        thread::sleep(SWEEP_INTERVAL);
        sweep(&ctx, IDLE_TIMEOUT);
    }
}

fn sweep(ctx: &ServerContext, idle_timeout: Duration) {
    for (id, session) in ctx.session_snapshot() {
        if session.is_transfer_in_progress() {
            continue;
        }
        if session.idle_for() > idle_timeout {
            tracing::info!(peer = %session.peer_addr(), session_id = id, "evicting idle session");
            session.evict();
            ctx.deregister(id);
        }
    }
}
