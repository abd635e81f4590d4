//! # Check Command Implementation
//!
//! Builds the plan and replays it. A certified plan prints a short summary;
//! any finding prints the full report, grouped by kind with a suggested
//! directive for each finding, and the command exits with a failure status.
//!
//! This command is read-only.

use anyhow::{bail, Result};
use clap::Args;
use serde_json::json;

use errata_scheduler::error::Error;
use errata_scheduler::output::{self, emoji, OutputConfig};
use errata_scheduler::phases::orchestrator;

use super::InputArgs;

/// Build the plan and certify it by replay
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, output: &OutputConfig) -> Result<()> {
    let mut inputs = args.input.load()?;
    let plan = orchestrator::build(
        &inputs.catalog,
        &mut inputs.advisories,
        &inputs.config,
        &inputs.options,
    )?;

    match orchestrator::validate(&plan, &inputs.catalog, &inputs.config) {
        Ok(certification) => {
            if args.json {
                let summary = json!({
                    "status": "certified",
                    "buckets": plan.len(),
                    "parentPackages": certification.parent_packages(),
                    "childPackages": certification.child_packages(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} Plan certified: {} buckets, {} initial and {} updated sources",
                    emoji(output, "✅", "[OK]"),
                    plan.len(),
                    certification.parent_packages().len(),
                    certification.child_packages().len()
                );
            }
            Ok(())
        }
        Err(Error::Consistency(report)) => {
            if args.json {
                let summary = json!({
                    "status": "failed",
                    "report": &*report,
                    "suggestions": report.suggestions(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", output::render_report(output, &report));
            }
            bail!("plan failed the consistency check with {} findings", report.len())
        }
        Err(other) => Err(other.into()),
    }
}
