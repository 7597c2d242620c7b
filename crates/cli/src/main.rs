//! Reroll CLI - reroll command

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = cli_lib::Cli::parse();
    cli_lib::run(cli)
}
