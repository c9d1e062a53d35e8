#![deny(unsafe_code)]

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    let status = daemon::run(env::args_os(), &mut stderr);
    daemon::exit_code_from(status)
}
