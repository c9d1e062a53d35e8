//! The interactive driver: reads whitespace-split commands, keeps
//! `LOCAL_LS`/`LOCAL_CD`/`LOCAL_PWD`/`HELP`/`EXIT` local, and forwards every
//! other verb to the server.

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use xfer_core::{ClientStats, CoreError};

use crate::connection::Connection;
use crate::local_listing;
use crate::reader::{self, ClientEvent, Expectation, ReaderHandle};
use protocol::Sentinel;

/// How long `PUT` waits for `READY_FOR_FILE` before giving up.
const PUT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// How long `QUIT`/`EXIT` waits for the server's goodbye response.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// What the read loop driving a [`Driver`] should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Owns the connection, the reader thread handle, and the client-local
/// working directory used by `LOCAL_LS`/`LOCAL_CD`/`LOCAL_PWD`.
pub struct Driver {
    connection: Connection,
    reader: ReaderHandle,
    stats: Arc<ClientStats>,
    cwd: PathBuf,
}

impl Driver {
    /// Connects to `addr`, spawns the reader thread, and consumes the
    /// server's initial greeting. The client-local working directory starts
    /// at the process's current directory.
    pub fn connect(addr: SocketAddr, out: &mut impl Write) -> Result<Self, CoreError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::connect_in(addr, cwd, out)
    }

    /// Like [`Self::connect`], but with an explicit starting directory
    /// instead of the process's current directory.
    pub fn connect_in(addr: SocketAddr, cwd: PathBuf, out: &mut impl Write) -> Result<Self, CoreError> {
        let (connection, read_half) = Connection::connect(addr)?;
        let stats = Arc::new(ClientStats::new());
        let reader = reader::spawn(read_half, Arc::clone(&stats));
        match reader.recv() {
            Some(ClientEvent::Response { code, text, .. }) => {
                let _ = writeln!(out, "{code} {text}");
            }
            Some(ClientEvent::Disconnected) | None => {
                return Err(CoreError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "server closed the connection before greeting",
                )))
            }
            Some(ClientEvent::Failed(msg)) => return Err(CoreError::Internal(msg)),
            Some(other) => {
                tracing::warn!(?other, "unexpected event in place of greeting");
            }
        }
        Ok(Self {
            connection,
            reader,
            stats,
            cwd,
        })
    }

    /// Clones the underlying socket so a `Ctrl-C` handler can send a
    /// best-effort `QUIT` without borrowing the driver itself.
    pub fn try_clone_stream(&self) -> Result<std::net::TcpStream, CoreError> {
        self.connection.try_clone_stream()
    }

    /// Processes one input line. Returns [`Outcome::Quit`] once the caller
    /// should stop feeding input and disconnect.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Outcome {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Outcome::Continue;
        }
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let arg = parts.next().map(str::trim).unwrap_or("");

        match verb.as_str() {
            "HELP" => {
                print_help(out);
                Outcome::Continue
            }
            "LOCAL_LS" => {
                self.local_ls(out);
                Outcome::Continue
            }
            "LOCAL_PWD" => {
                let _ = writeln!(out, "{}", self.cwd.display());
                Outcome::Continue
            }
            "LOCAL_CD" => {
                self.local_cd(arg, out);
                Outcome::Continue
            }
            "EXIT" | "QUIT" => {
                self.quit(out);
                Outcome::Quit
            }
            "GET" => {
                self.get(arg, out);
                Outcome::Continue
            }
            "PUT" => {
                self.put(arg, out);
                Outcome::Continue
            }
            _ => {
                self.forward(trimmed, out);
                Outcome::Continue
            }
        }
    }

    fn local_ls(&self, out: &mut impl Write) {
        match local_listing::list(&self.cwd) {
            Ok(entries) => {
                for line in local_listing::render(&entries) {
                    let _ = writeln!(out, "{line}");
                }
            }
            Err(err) => {
                let _ = writeln!(out, "local listing failed: {err}");
            }
        }
    }

    fn local_cd(&mut self, arg: &str, out: &mut impl Write) {
        if arg.is_empty() {
            let _ = writeln!(out, "LOCAL_CD requires a directory");
            return;
        }
        let target = self.cwd.join(arg);
        match target.canonicalize() {
            Ok(resolved) if resolved.is_dir() => {
                self.cwd = resolved;
                let _ = writeln!(out, "local directory changed to {}", self.cwd.display());
            }
            Ok(_) => {
                let _ = writeln!(out, "{arg} is not a directory");
            }
            Err(err) => {
                let _ = writeln!(out, "cannot change to {arg}: {err}");
            }
        }
    }

    fn get(&mut self, arg: &str, out: &mut impl Write) {
        if arg.is_empty() {
            let _ = writeln!(out, "GET requires a filename");
            return;
        }
        let dest = self.cwd.join(arg);
        self.reader.set_expectation(Expectation::FileStart { dest });
        if let Err(err) = self.connection.send_command(&format!("GET {arg}")) {
            let _ = writeln!(out, "failed to send GET: {err}");
            return;
        }
        self.stats.record_command_sent();

        loop {
            match self.reader.recv() {
                Some(ClientEvent::Response { code, text, details }) if code == 150 => {
                    print_response(out, code, &text, &details);
                }
                Some(ClientEvent::Downloaded { dest, bytes }) => {
                    let _ = writeln!(out, "saved {bytes} bytes to {}", dest.display());
                    return;
                }
                Some(ClientEvent::Response { code, text, details }) => {
                    print_response(out, code, &text, &details);
                    return;
                }
                Some(ClientEvent::Disconnected) => {
                    let _ = writeln!(out, "server closed the connection");
                    return;
                }
                Some(ClientEvent::Failed(msg)) => {
                    let _ = writeln!(out, "transfer failed: {msg}");
                    return;
                }
                Some(ClientEvent::ReadyForUpload) | None => {
                    let _ = writeln!(out, "no response received");
                    return;
                }
            }
        }
    }

    fn put(&mut self, arg: &str, out: &mut impl Write) {
        if arg.is_empty() {
            let _ = writeln!(out, "PUT requires a filename");
            return;
        }
        let source = self.cwd.join(arg);
        let mut file = match File::open(&source) {
            Ok(file) => file,
            Err(err) => {
                let _ = writeln!(out, "cannot read {arg}: {err}");
                return;
            }
        };

        self.reader.set_expectation(Expectation::ReadyForUpload);
        if let Err(err) = self.connection.send_command(&format!("PUT {arg}")) {
            let _ = writeln!(out, "failed to send PUT: {err}");
            return;
        }
        self.stats.record_command_sent();

        match self.reader.recv_timeout(PUT_READY_TIMEOUT) {
            Some(ClientEvent::ReadyForUpload) => {}
            Some(ClientEvent::Response { code, text, details }) => {
                print_response(out, code, &text, &details);
                return;
            }
            Some(ClientEvent::Disconnected) => {
                let _ = writeln!(out, "server closed the connection");
                return;
            }
            Some(ClientEvent::Failed(msg)) => {
                let _ = writeln!(out, "upload failed: {msg}");
                return;
            }
            Some(ClientEvent::Downloaded { .. }) | None => {
                self.reader.set_expectation(Expectation::None);
                let _ = writeln!(out, "timed out waiting for the server to accept the upload");
                return;
            }
        }

        if let Err(err) = self.connection.write_sentinel(Sentinel::FileStart) {
            let _ = writeln!(out, "upload failed: {err}");
            return;
        }
        let sent = match self.connection.send_body(&mut file) {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = writeln!(out, "upload failed: {err}");
                return;
            }
        };
        if let Err(err) = self.connection.write_sentinel(Sentinel::FileEnd) {
            let _ = writeln!(out, "upload failed: {err}");
            return;
        }
        self.stats.record_transfer(sent, true);

        match self.reader.recv() {
            Some(ClientEvent::Response { code, text, details }) => {
                print_response(out, code, &text, &details);
            }
            Some(other) => {
                tracing::warn!(?other, "unexpected event after upload body");
            }
            None => {
                let _ = writeln!(out, "no confirmation received for the upload");
            }
        }
    }

    fn forward(&mut self, line: &str, out: &mut impl Write) {
        if let Err(err) = self.connection.send_command(line) {
            let _ = writeln!(out, "failed to send command: {err}");
            return;
        }
        self.stats.record_command_sent();
        match self.reader.recv() {
            Some(ClientEvent::Response { code, text, details }) => {
                print_response(out, code, &text, &details);
            }
            Some(ClientEvent::Disconnected) => {
                let _ = writeln!(out, "server closed the connection");
            }
            Some(ClientEvent::Failed(msg)) => {
                let _ = writeln!(out, "command failed: {msg}");
            }
            Some(other) => {
                tracing::warn!(?other, "unexpected event for a non-transfer command");
            }
            None => {
                let _ = writeln!(out, "no response received");
            }
        }
    }

    fn quit(&mut self, out: &mut impl Write) {
        let _ = self.connection.send_command("QUIT");
        self.stats.record_command_sent();
        match self.reader.recv_timeout(QUIT_TIMEOUT) {
            Some(ClientEvent::Response { code, text, .. }) => {
                let _ = writeln!(out, "{code} {text}");
            }
            _ => {
                let _ = writeln!(out, "disconnecting");
            }
        }
        self.print_session_summary(out);
        self.reader.join();
    }

    fn print_session_summary(&self, out: &mut impl Write) {
        let snap = self.stats.snapshot();
        let _ = writeln!(out, "--- session statistics ---");
        let _ = writeln!(out, "commands sent:     {}", snap.commands_sent);
        let _ = writeln!(out, "files transferred: {}", snap.files_transferred);
        let _ = writeln!(out, "bytes sent:        {}", snap.bytes_sent);
        let _ = writeln!(out, "bytes received:    {}", snap.bytes_received);
        let _ = writeln!(out, "errors:            {}", snap.errors);
    }
}

fn print_response(out: &mut impl Write, code: u16, text: &str, details: &[String]) {
    let _ = writeln!(out, "{code} {text}");
    for line in details {
        let _ = writeln!(out, "{line}");
    }
}

fn print_help(out: &mut impl Write) {
    let _ = writeln!(
        out,
        "Local commands: LOCAL_LS, LOCAL_CD <dir>, LOCAL_PWD, HELP, EXIT\n\
         Server commands: LIST, GET <file>, PUT <file>, DEL <file>, STAT, SYST, QUIT"
    );
}
