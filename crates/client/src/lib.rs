//! The interactive client: connects, drives the command loop, and prints
//! a session-statistics summary on disconnect.

mod cli;
mod connection;
mod driver;
mod local_listing;
mod reader;
mod signals;

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use clap::Parser;

pub use driver::{Driver, Outcome};
pub use xfer_core::CoreError;

/// Connects to `addr`, then reads commands from `input` one line at a time
/// until `EXIT`/`QUIT` or EOF, writing all output (responses, local command
/// results, the closing statistics summary) to `output`. The client-local
/// working directory starts at the process's current directory.
pub fn run_session(
    addr: SocketAddr,
    input: impl BufRead,
    output: impl Write,
) -> Result<(), CoreError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    run_session_in(addr, cwd, input, output)
}

/// Like [`run_session`], but with an explicit starting directory instead of
/// the process's current directory.
pub fn run_session_in(
    addr: SocketAddr,
    cwd: PathBuf,
    mut input: impl BufRead,
    mut output: impl Write,
) -> Result<(), CoreError> {
    let mut driver = Driver::connect_in(addr, cwd, &mut output)?;
    if let Ok(stream) = driver.try_clone_stream() {
        signals::install(stream);
    }
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = input.read_line(&mut line).map_err(CoreError::transport)?;
        if bytes_read == 0 {
            let _ = writeln!(output, "EOF on input, disconnecting");
            driver.handle_line("QUIT", &mut output);
            return Ok(());
        }
        if driver.handle_line(&line, &mut output) == Outcome::Quit {
            return Ok(());
        }
    }
}

/// Parses `args`, wires up logging, resolves `host:port`, and drives an
/// interactive session over `stdin`. Returns the process exit code the
/// caller should use.
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

    let addr = match (parsed.host.as_str(), parsed.port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                let _ = writeln!(stderr, "could not resolve {}:{}", parsed.host, parsed.port);
                return 2;
            }
        },
        Err(err) => {
            let _ = writeln!(stderr, "could not resolve {}:{}: {err}", parsed.host, parsed.port);
            return 2;
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match run_session(addr, stdin.lock(), stdout.lock()) {
        Ok(()) => 0,
        Err(err) => {
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
