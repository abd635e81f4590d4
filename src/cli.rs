//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use errata_scheduler::output::OutputConfig;

use crate::commands;

/// Errata Scheduler - Order package updates by their advisories
#[derive(Parser, Debug)]
#[command(name = "errata-scheduler")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "ERRATA_SCHEDULER_LOG"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the ordered update plan and print it
    Plan(commands::plan::PlanArgs),

    /// Build the plan and replay it, failing on any consistency finding
    Check(commands::check::CheckArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp(None)
            .format_target(false)
            .init();

        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Plan(args) => commands::plan::execute(args, &output),
            Commands::Check(args) => commands::check::execute(args, &output),
        }
    }
}
