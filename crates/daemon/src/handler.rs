//! Per-client command handler: one framed command unit at a time, dispatch,
//! path resolution under the working directory, response emission.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use protocol::{Response, ResponseCode, Sentinel};
use xfer_core::{sanitize_filename, CoreError, FramedStream, ResourceError, ServerContext, Session};

/// Commands longer than this are rejected as malformed before dispatch.
const MAX_COMMAND_LEN: usize = 1024;

/// How long a per-command read is allowed to block before the handler
/// loop re-checks [`ServerContext::is_running`]. A `PUT` body receive is
/// unaffected by this: [`FramedStream::receive_body`] treats the same
/// timeout as "keep waiting" rather than an error.
const READ_POLL: Duration = Duration::from_secs(1);

pub fn handle_connection(stream: std::net::TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) {
    let (id, session) = ctx.register(Session::new(peer));
    if let Ok(clone) = stream.try_clone() {
        session.set_shutdown_handle(clone);
    }
    let mut framed = FramedStream::new(stream);
    if let Err(err) = framed.set_read_timeout(Some(READ_POLL)) {
        tracing::warn!(%peer, error = %err, "failed to set read timeout");
    }

    let outcome = serve(&mut framed, &ctx, &session);
    if let Err(err) = &outcome {
        tracing::warn!(%peer, error = %err, "session ended with an error");
        ctx.stats().record_error();
    }

    log_session_summary(&session);
    ctx.deregister(id);
}

fn log_session_summary(session: &Session) {
    let (sent, received) = session.byte_counts();
    tracing::info!(
        peer = %session.peer_addr(),
        commands = session.command_count(),
        bytes_sent = sent,
        bytes_received = received,
        "session closed",
    );
}

fn serve(framed: &mut FramedStream, ctx: &ServerContext, session: &Session) -> Result<(), CoreError> {
    framed.write_response(&Response::from(ResponseCode::Ready))?;
    loop {
        if !ctx.is_running() {
            return Ok(());
        }
        let line = match framed.read_line(MAX_COMMAND_LEN) {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(peer = %session.peer_addr(), "peer disconnected");
                return Ok(());
            }
            Err(err) if err.is_timeout() => continue,
            Err(err) => return Err(err),
        };
        session.log_command(&line);
        ctx.stats().record_command();

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let arg = parts.next().map(str::trim).unwrap_or("");

        match verb.as_str() {
            "LIST" => handle_list(framed, ctx)?,
            "GET" => handle_get(framed, ctx, session, arg)?,
            "PUT" => handle_put(framed, ctx, session, arg)?,
            "DEL" => handle_del(framed, ctx, arg)?,
            "STAT" => handle_stat(framed, ctx)?,
            "SYST" => handle_syst(framed)?,
            "QUIT" => {
                framed.write_response(&Response::from(ResponseCode::Goodbye))?;
                return Ok(());
            }
            "" => {
                framed.write_response(
                    &Response::from(ResponseCode::SyntaxError).with_text("empty command"),
                )?;
            }
            other => {
                tracing::warn!(peer = %session.peer_addr(), verb = other, "unknown verb");
                framed.write_response(
                    &Response::from(ResponseCode::NotImplemented)
                        .with_text(format!("unknown command {other}")),
                )?;
            }
        }
    }
}

fn handle_list(framed: &mut FramedStream, ctx: &ServerContext) -> Result<(), CoreError> {
    let mut rows = Vec::new();
    for entry in fs::read_dir(ctx.working_dir()).map_err(CoreError::transport)? {
        let entry = entry.map_err(CoreError::transport)?;
        let metadata = entry.metadata().map_err(CoreError::transport)?;
        let modified = metadata
            .modified()
            .map(format_timestamp)
            .unwrap_or_else(|_| "unknown".to_string());
        rows.push((
            metadata.is_dir(),
            metadata.len(),
            modified,
            entry.file_name().to_string_lossy().into_owned(),
        ));
    }
    rows.sort_by(|a, b| a.3.cmp(&b.3));

    // Mirrors the client's own local-listing row format, so `LIST` and
    // `LOCAL_LS` output read the same way: `TYPE SIZE DATE NAME`.
    let lines = rows
        .into_iter()
        .map(|(is_dir, size, modified, name)| {
            let kind = if is_dir { "DIR" } else { "FILE" };
            let pad = " ".repeat(8usize.saturating_sub(size.to_string().len()));
            format!("{kind:<6} {size} bytes{pad} {modified} {name}")
        })
        .collect();
    framed.write_response(&Response::from(ResponseCode::CmdOk).with_details(lines))
}

fn format_timestamp(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let (y, m, d) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{y:04}-{m:02}-{d:02} {h:02}:{min:02}:{s:02}",
        h = rem / 3600,
        min = (rem % 3600) / 60,
        s = rem % 60,
    )
}

/// Howard Hinnant's `civil_from_days`: converts a day count since the Unix
/// epoch into a `(year, month, day)` triple.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn handle_get(
    framed: &mut FramedStream,
    ctx: &ServerContext,
    session: &Session,
    arg: &str,
) -> Result<(), CoreError> {
    if arg.is_empty() {
        return framed.write_response(
            &Response::from(ResponseCode::SyntaxErrorParam).with_text("GET requires a filename"),
        );
    }
    let name = match sanitize_filename(arg) {
        Ok(name) => name,
        Err(_) => {
            return framed.write_response(
                &Response::from(ResponseCode::FileUnavailable)
                    .with_text("invalid filename"),
            )
        }
    };
    let path = ctx.working_dir().join(name);
    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return framed.write_response(
                &Response::from(ResponseCode::FileUnavailable).with_text("file not found"),
            )
        }
        Err(err) => return Err(CoreError::transport(err)),
    };
    let metadata = file.metadata().map_err(CoreError::transport)?;
    if metadata.is_dir() {
        return framed.write_response(
            &Response::from(ResponseCode::FileUnavailable).with_text("is a directory"),
        );
    }
    let len = metadata.len();

    session.set_transfer_in_progress(true);
    framed.write_response(&Response::from(ResponseCode::EnteringTransfer).with_details(vec![
        format!("File: {name}"),
        format!("Size: {len} bytes"),
    ]))?;
    framed.write_sentinel(Sentinel::FileStart)?;
    let result = framed.send_body(&mut file);
    framed.write_sentinel(Sentinel::FileEnd)?;
    session.set_transfer_in_progress(false);

    let bytes = result?;
    session.add_bytes_sent(bytes);
    ctx.stats().record_transfer(bytes, true);
    Ok(())
}

fn handle_put(
    framed: &mut FramedStream,
    ctx: &ServerContext,
    session: &Session,
    arg: &str,
) -> Result<(), CoreError> {
    if arg.is_empty() {
        return framed.write_response(
            &Response::from(ResponseCode::SyntaxErrorParam).with_text("PUT requires a filename"),
        );
    }
    let name = match sanitize_filename(arg) {
        Ok(name) => name,
        Err(_) => {
            return framed.write_response(
                &Response::from(ResponseCode::FileUnavailable).with_text("invalid filename"),
            )
        }
    };
    let dest = ctx.working_dir().join(name);
    if dest.exists() {
        return framed.write_response(
            &Response::from(ResponseCode::FileUnavailable).with_text("file already exists"),
        );
    }
    let part_path = part_path_for(&dest);
    let mut staging = File::create(&part_path).map_err(CoreError::transport)?;

    session.set_transfer_in_progress(true);
    framed.write_response(&Response::from(ResponseCode::EnteringTransfer))?;
    framed.write_sentinel(Sentinel::ReadyForFile)?;

    if let Err(err) = framed.skip_until_sentinel(Sentinel::FileStart) {
        session.set_transfer_in_progress(false);
        let _ = fs::remove_file(&part_path);
        return Err(err);
    }

    let result = framed.receive_body(Sentinel::FileEnd, &mut staging);
    session.set_transfer_in_progress(false);

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(err) => {
            let _ = fs::remove_file(&part_path);
            return Err(err);
        }
    };
    drop(staging);
    if let Err(err) = fs::rename(&part_path, &dest) {
        let _ = fs::remove_file(&part_path);
        return Err(CoreError::transfer_io(err));
    }

    session.add_bytes_received(bytes);
    ctx.stats().record_transfer(bytes, false);
    framed.write_response(&Response::from(ResponseCode::FileStatusOk).with_text("transfer complete"))
}

/// Staging path a `PUT` writes to before the atomic rename: `<dest>.part`.
fn part_path_for(dest: &std::path::Path) -> std::path::PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    std::path::PathBuf::from(name)
}

fn handle_del(framed: &mut FramedStream, ctx: &ServerContext, arg: &str) -> Result<(), CoreError> {
    if arg.is_empty() {
        return framed.write_response(
            &Response::from(ResponseCode::SyntaxErrorParam).with_text("DEL requires a filename"),
        );
    }
    let name = match sanitize_filename(arg) {
        Ok(name) => name,
        Err(_) => {
            return framed.write_response(
                &Response::from(ResponseCode::FileUnavailable).with_text("invalid filename"),
            )
        }
    };
    let path = ctx.working_dir().join(name);
    match fs::remove_file(&path) {
        Ok(()) => framed.write_response(
            &Response::from(ResponseCode::CmdOk).with_text("deleted"),
        ),
        Err(err) if err.kind() == ErrorKind::NotFound => framed.write_response(
            &Response::from(ResponseCode::FileUnavailable).with_text("file not found"),
        ),
        Err(err) => Err(CoreError::Resource(ResourceError::PermissionDenied(err.to_string()))),
    }
}

fn handle_stat(framed: &mut FramedStream, ctx: &ServerContext) -> Result<(), CoreError> {
    let snap = ctx.stats().snapshot();
    let detail = vec![
        format!("connections {}", snap.connections),
        format!("commands_processed {}", snap.commands_processed),
        format!("files_transferred {}", snap.files_transferred),
        format!("bytes_sent {}", snap.bytes_sent),
        format!("bytes_received {}", snap.bytes_received),
        format!("errors {}", snap.errors),
        format!("sessions {}", ctx.session_count()),
    ];
    framed.write_response(&Response::from(ResponseCode::CmdOk).with_details(detail))
}

fn handle_syst(framed: &mut FramedStream) -> Result<(), CoreError> {
    framed.write_response(&Response::from(ResponseCode::CmdOk).with_text("UNIX single-channel xfer"))
}
