//! `Ctrl-C` handling: on `SIGINT`, send a best-effort `QUIT` over the
//! connection and exit, mirroring the original client's signal handler
//! (which wrote `QUIT`, slept briefly, then called `sys.exit(0)`).

use std::io::Write;
use std::net::TcpStream;

/// Installs a background thread that sends `QUIT` on `stream` and exits
/// the process the first time `SIGINT` arrives. No-op on platforms
/// without `signal-hook` support.
pub fn install(stream: TcpStream) {
    imp::install(stream);
}

#[cfg(unix)]
mod imp {
    use super::*;
    use signal_hook::consts::SIGINT;
    use signal_hook::iterator::Signals;

    pub fn install(mut stream: TcpStream) {
        let mut signals = match Signals::new([SIGINT]) {
            Ok(signals) => signals,
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGINT handler");
                return;
            }
        };
        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                let _ = stream.write_all(b"QUIT\r\n");
                std::process::exit(0);
            }
        });
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;

    pub fn install(_stream: TcpStream) {}
}
