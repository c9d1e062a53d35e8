//! Drives the interactive client against a real daemon over a local
//! `BufRead`/`Vec<u8>` pair, exercising `GET`, `PUT`, `LIST`, and `EXIT`.

mod support;

use std::fs;
use std::io::Cursor;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tempfile::tempdir;

use support::{allocate_test_port, start_daemon};

fn wait_for_daemon(port: u16) {
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpStream::connect(target) {
            Ok(_) => return,
            Err(err) => {
                if Instant::now() >= deadline {
                    panic!("daemon never came up on port {port}: {err}");
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

fn run_script(port: u16, cwd: &std::path::Path, script: &str) -> String {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let mut output = Vec::new();
    client::run_session_in(
        addr,
        cwd.to_path_buf(),
        Cursor::new(script.as_bytes().to_vec()),
        &mut output,
    )
    .expect("session completes");
    String::from_utf8(output).expect("output is utf-8")
}

#[test]
fn list_get_and_exit_round_trip() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("note.txt"), b"remember the milk").expect("seed file");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);
    wait_for_daemon(port);

    let download_dir = tempdir().expect("download dir");

    let transcript = run_script(port, download_dir.path(), "LIST\r\nGET note.txt\r\nEXIT\r\n");

    assert!(transcript.contains("200 Command OK"));
    assert!(transcript.contains("File: note.txt"));
    assert!(transcript.contains("Size: 17 bytes"));
    assert!(transcript.contains("saved 17 bytes"));
    assert!(transcript.contains("--- session statistics ---"));
    assert_eq!(
        fs::read(download_dir.path().join("note.txt")).expect("downloaded file"),
        b"remember the milk"
    );
}

#[test]
fn put_uploads_a_local_file() {
    let server_dir = tempdir().expect("server dir");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(server_dir.path().to_path_buf(), port, listener);
    wait_for_daemon(port);

    let client_dir = tempdir().expect("client dir");
    fs::write(client_dir.path().join("upload.bin"), b"outgoing payload").expect("seed upload");

    let transcript = run_script(port, client_dir.path(), "PUT upload.bin\r\nEXIT\r\n");

    assert!(transcript.contains("226"));
    assert_eq!(
        fs::read(server_dir.path().join("upload.bin")).expect("uploaded file exists"),
        b"outgoing payload"
    );
}

#[test]
fn local_commands_never_touch_the_server() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);
    wait_for_daemon(port);

    let transcript = run_script(port, dir.path(), "LOCAL_PWD\r\nHELP\r\nEXIT\r\n");
    assert!(transcript.lines().next().is_some());
    // Only the final EXIT's QUIT ever reaches the server; LOCAL_PWD/HELP stay local.
    assert_eq!(ctx.stats().snapshot().commands_processed, 1);
}
