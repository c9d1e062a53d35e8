//! End-to-end scenarios against a real `TcpListener`: `GET`, `PUT`, `LIST`,
//! `DEL`, an unknown verb, and an upload interrupted mid-body.

mod support;

use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;

use protocol::Sentinel;
use tempfile::tempdir;

use support::{allocate_test_port, connect_with_retries, read_line, send_line, start_daemon};

fn read_greeting(stream: &mut TcpStream) -> String {
    read_line(stream)
}

#[test]
fn get_returns_file_contents_framed_by_sentinels() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("hello.txt"), b"hello world").expect("seed file");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    assert_eq!(read_greeting(&mut stream), "220 Service ready");

    send_line(&mut stream, "GET hello.txt");
    assert_eq!(read_line(&mut stream), "150 About to begin transfer");
    assert_eq!(read_line(&mut stream), "File: hello.txt");
    assert_eq!(read_line(&mut stream), "Size: 11 bytes");

    let mut byte = [0u8; 1];
    let mut body = Vec::new();
    loop {
        stream.read_exact(&mut byte).expect("read body byte");
        body.push(byte[0]);
        if body.ends_with(Sentinel::FileStart.bytes()) {
            body.clear();
            break;
        }
    }
    loop {
        stream.read_exact(&mut byte).expect("read body byte");
        body.push(byte[0]);
        if body.ends_with(Sentinel::FileEnd.bytes()) {
            body.truncate(body.len() - Sentinel::FileEnd.bytes().len());
            break;
        }
    }
    assert_eq!(body, b"hello world");
}

#[test]
fn get_of_missing_file_reports_file_unavailable() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "GET missing.bin");
    assert_eq!(read_line(&mut stream), "550 file not found");
}

#[test]
fn put_writes_a_new_file_and_rejects_overwriting_it() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);

    send_line(&mut stream, "PUT upload.bin");
    assert_eq!(read_line(&mut stream), "150 About to begin transfer");
    assert_eq!(read_line(&mut stream), "READY_FOR_FILE");
    send_line(&mut stream, "FILE_START");
    stream.write_all(b"payload").expect("write payload");
    stream.write_all(Sentinel::FileEnd.bytes()).expect("write terminator");
    assert_eq!(read_line(&mut stream), "226 transfer complete");
    assert_eq!(
        fs::read(dir.path().join("upload.bin")).expect("uploaded file exists"),
        b"payload"
    );
    assert!(!dir.path().join("upload.bin.part").exists());

    send_line(&mut stream, "PUT upload.bin");
    assert_eq!(read_line(&mut stream), "550 file already exists");
}

#[test]
fn list_reports_directory_contents_sorted() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("b.txt"), b"").expect("seed b");
    fs::write(dir.path().join("a.txt"), b"").expect("seed a");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "LIST");
    assert_eq!(read_line(&mut stream), "200 Command OK");
    let first = read_line(&mut stream);
    let second = read_line(&mut stream);
    assert!(first.starts_with("FILE") && first.ends_with("a.txt"), "{first}");
    assert!(second.starts_with("FILE") && second.ends_with("b.txt"), "{second}");
}

#[test]
fn del_removes_a_file_and_reports_missing_files() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("gone.txt"), b"x").expect("seed file");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "DEL gone.txt");
    assert_eq!(read_line(&mut stream), "200 deleted");
    assert!(!dir.path().join("gone.txt").exists());

    send_line(&mut stream, "DEL gone.txt");
    assert_eq!(read_line(&mut stream), "550 file not found");
}

#[test]
fn unknown_verb_gets_not_implemented() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "FROBNICATE");
    assert_eq!(read_line(&mut stream), "502 unknown command FROBNICATE");
}

#[test]
fn quit_closes_the_session() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "QUIT");
    assert_eq!(read_line(&mut stream), "221 Service closing connection");

    let mut buf = [0u8; 1];
    assert_eq!(stream.read(&mut buf).expect("eof after quit"), 0);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while ctx.session_count() > 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert_eq!(ctx.session_count(), 0);
}

#[test]
fn interrupted_upload_leaves_no_partial_file() {
    let dir = tempdir().expect("tempdir");
    let (port, listener) = allocate_test_port();
    let (_ctx, _daemon) = start_daemon(dir.path().to_path_buf(), port, listener);

    let mut stream = connect_with_retries(port);
    read_greeting(&mut stream);
    send_line(&mut stream, "PUT partial.bin");
    let _ = read_line(&mut stream);
    let _ = read_line(&mut stream);
    send_line(&mut stream, "FILE_START");
    stream.write_all(b"not the whole body").expect("write partial body");
    drop(stream);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while dir.path().join("partial.bin.part").exists() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(!dir.path().join("partial.bin").exists());
    assert!(!dir.path().join("partial.bin.part").exists());
}
