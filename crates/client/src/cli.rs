//! Command-line surface for the `xfer` binary: `[host [port]]`, `-v`/
//! `--verbose` (repeatable), and the `--help`/`--version` clap gives for free.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "xfer", version, about = "Single-channel file-transfer client")]
pub struct Args {
    /// Host to connect to.
    #[arg(default_value = "localhost")]
    pub host: String,

    /// Port to connect to.
    #[arg(default_value_t = 8888)]
    pub port: u16,

    /// Increase log verbosity; repeat for more detail.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
