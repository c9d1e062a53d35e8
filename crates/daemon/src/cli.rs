//! Command-line surface for the `xferd` binary: `[host [port]]`, `-v`/
//! `--verbose` (repeatable), and the `--help`/`--version` clap gives for free.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "xferd", version, about = "Single-channel file-transfer daemon")]
pub struct Args {
    /// Address to bind to.
    #[arg(default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(default_value_t = 8888)]
    pub port: u16,

    /// Increase log verbosity; repeat for more detail.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
