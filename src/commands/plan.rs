//! # Plan Command Implementation
//!
//! Builds the ordered update plan from a snapshot and prints it, one block
//! per bucket with its advisories and source packages. `--json` prints the
//! plan as a JSON document instead.
//!
//! The plan is not replayed here; use `check` for that.

use anyhow::Result;
use clap::Args;

use errata_scheduler::output::{self, OutputConfig};
use errata_scheduler::phases::orchestrator;

use super::InputArgs;

/// Build and print the update plan
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Only print buckets after this key.
    #[arg(long, value_name = "KEY")]
    pub after: Option<i64>,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, output: &OutputConfig) -> Result<()> {
    let mut inputs = args.input.load()?;
    let plan = orchestrator::build(
        &inputs.catalog,
        &mut inputs.advisories,
        &inputs.config,
        &inputs.options,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    match args.after {
        Some(current) => {
            for (key, packages) in plan.iter_after(current) {
                println!("{}", plan.update_detail_message(key));
                for nevra in packages {
                    println!("    - {}", nevra);
                }
            }
        }
        None => print!("{}", output::render_plan(output, &plan)),
    }

    Ok(())
}
