#![deny(unsafe_code)]

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    let status = client::run(env::args_os(), &mut stderr);
    client::exit_code_from(status)
}
