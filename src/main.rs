//! # Errata Scheduler CLI
//!
//! This is the binary entry point for the `errata-scheduler` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Loading the package snapshot and the override configuration.
//! - Handing them to the library and printing the plan or the replay report.
//!
//! All scheduling logic lives in the `errata_scheduler` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
