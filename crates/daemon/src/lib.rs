//! The server half of the single-channel file-transfer service: the accept
//! loop, the idle-session monitor, and the per-client command handler.
//!
//! Concurrency model is thread-per-connection (`std::net`, `std::thread`),
//! matching the synchronous style used throughout the shared session
//! plumbing this crate builds on rather than an async runtime.

mod cli;
mod handler;
mod monitor;

use std::ffi::OsString;
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use xfer_core::{CoreError, ServerContext};

/// How long `accept` is allowed to block before the accept loop re-checks
/// [`ServerContext::is_running`].
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Parses `args`, wires up logging, and runs the accept loop against the
/// current directory. Returns the process exit code the caller should use.
pub fn run<I, S>(args: I, stderr: &mut impl Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let parsed = match cli::Args::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(err) => {
            let _ = write!(stderr, "{err}");
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
        }
    };

    if logging::init(parsed.verbose).is_err() {
        let _ = writeln!(stderr, "logging already initialized");
    }

    let bind_addr = match format!("{}:{}", parsed.host, parsed.port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(host = %parsed.host, port = parsed.port, error = %err, "invalid bind address");
            let _ = writeln!(stderr, "invalid host/port: {err}");
            return 2;
        }
    };

    let working_dir = std::env::current_dir().unwrap_or_else(|_| ".".into());
    let ctx = Arc::new(ServerContext::new(working_dir));
    match serve(bind_addr, ctx) {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "daemon exited with an error");
            let _ = writeln!(stderr, "{err}");
            1
        }
    }
}

/// Converts the numeric status from [`run`] into a process [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, i32::from(u8::MAX));
    std::process::ExitCode::from(clamped as u8)
}

/// Runs the accept loop and session monitor until `ctx` is shut down
/// (via [`ServerContext::shut_down`]) or a fatal bind error occurs.
///
/// Spawns one handler thread per accepted connection and a dedicated
/// monitor thread that evicts sessions idle longer than
/// [`monitor::IDLE_TIMEOUT`]. Returns once the listener is closed and every
/// handler thread it spawned has been given a chance to exit.
pub fn serve(bind_addr: SocketAddr, ctx: Arc<ServerContext>) -> Result<(), CoreError> {
    let listener = TcpListener::bind(bind_addr).map_err(CoreError::transport)?;
    listener.set_nonblocking(true).map_err(CoreError::transport)?;
    tracing::info!(%bind_addr, "listening");

    let monitor_ctx = Arc::clone(&ctx);
    let monitor_running = Arc::new(AtomicBool::new(true));
    let monitor_flag = Arc::clone(&monitor_running);
    let monitor_handle = thread::spawn(move || monitor::run(monitor_ctx, monitor_flag));

    let mut workers = Vec::new();
    while ctx.is_running() {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "accepted connection");
                let worker_ctx = Arc::clone(&ctx);
                workers.push(thread::spawn(move || {
                    handler::handle_connection(stream, peer, worker_ctx);
                }));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(err) => {
                tracing::error!(error = %err, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
        workers.retain(|handle| !handle.is_finished());
    }

    tracing::info!("shutting down, waiting for in-flight sessions");
    monitor_running.store(false, Ordering::Release);
    for (_, session) in ctx.session_snapshot() {
        session.close_for_shutdown();
    }
    for handle in workers {
        let _ = handle.join();
    }
    let _ = monitor_handle.join();
    Ok(())
}
