//! ## mockreactor-cli
//! **Demonstration runner for the virtual-clock reactor**
//!
//! Runs a few canned scenarios on a [`mockreactor_core::Reactor`] and reports
//! how far the virtual clock travelled, so the loop's behaviour can be
//! inspected with `RUST_LOG=debug` without writing a test.

use clap::Parser;

mod commands;
mod error;
mod scenarios;

use commands::Cli;

fn main() -> Result<(), error::CliError> {
    let cli = Cli::parse();
    commands::run_command(cli)
}
