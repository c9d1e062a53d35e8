//! Shared scaffolding for daemon integration tests: an ephemeral-port
//! daemon plus a byte-at-a-time line reader for the response wire format.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use xfer_core::ServerContext;

pub fn allocate_test_port() -> (u16, TcpListener) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    (port, listener)
}

/// Starts `daemon::serve` on a background thread rooted at `working_dir`,
/// releasing `held_listener` right before spawning to shrink the window
/// between port reservation and the daemon's own bind.
pub fn start_daemon(
    working_dir: PathBuf,
    port: u16,
    held_listener: TcpListener,
) -> (Arc<ServerContext>, JoinHandle<()>) {
    drop(held_listener);
    let ctx = Arc::new(ServerContext::new(working_dir));
    let daemon_ctx = Arc::clone(&ctx);
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let handle = thread::spawn(move || {
        daemon::serve(addr, daemon_ctx).expect("daemon exited with an error");
    });
    (ctx, handle)
}

pub fn connect_with_retries(port: u16) -> TcpStream {
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpStream::connect(target) {
            Ok(stream) => return stream,
            Err(err) => {
                if Instant::now() >= deadline {
                    panic!("could not connect to daemon on port {port}: {err}");
                }
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

pub fn send_line(stream: &mut TcpStream, line: &str) {
    stream.write_all(line.as_bytes()).expect("write command");
    stream.write_all(b"\r\n").expect("write terminator");
}

/// Reads one CRLF-terminated line, byte at a time. Fine for test fixtures;
/// the real read path is `xfer_core::FramedStream`.
pub fn read_line(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).expect("read byte");
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n") {
            buf.truncate(buf.len() - 2);
            return String::from_utf8(buf).expect("response is valid utf-8");
        }
    }
}

pub fn read_exact_bytes(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).expect("read exact bytes");
    buf
}
