use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use xfer_core::ServerContext;

pub fn allocate_test_port() -> (u16, TcpListener) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    (port, listener)
}

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
