//! # CLI Command Implementations
//!
//! Each subcommand of `errata-scheduler` lives in its own file with an `Args`
//! struct derived with `clap` and an `execute` function that calls into the
//! `errata_scheduler` library.
//!
//! Both commands read the same inputs, described by [`InputArgs`]: a YAML
//! snapshot standing in for the package catalog and the advisory stream, an
//! optional configuration document, and an optional "now".

pub mod check;
pub mod plan;

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::DateTime;
use clap::Args;
use serde::Deserialize;

use errata_scheduler::advisory::{Advisory, MemoryAdvisorySource};
use errata_scheduler::catalog::{MemoryCatalog, SourceRecord};
use errata_scheduler::config::{self, Config};
use errata_scheduler::phases::orchestrator::BuildOptions;

/// Inputs shared by every command.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// YAML snapshot holding `sources` and `advisories`.
    #[arg(short, long, value_name = "FILE")]
    pub snapshot: PathBuf,

    /// Scheduler configuration with override directives.
    #[arg(short, long, value_name = "FILE", env = "ERRATA_SCHEDULER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Current time in epoch seconds. Buckets after it are hidden.
    #[arg(long, value_name = "TIMESTAMP")]
    pub now: Option<i64>,
}

/// Snapshot file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Snapshot {
    #[serde(default)]
    sources: Vec<SourceRecord>,
    #[serde(default)]
    advisories: Vec<Advisory>,
    /// Channels the advisory source advertises; defaults to every channel
    /// the advisories mention.
    #[serde(default)]
    channels: Option<BTreeSet<String>>,
}

/// Everything a command needs to build a plan.
pub struct Inputs {
    pub catalog: MemoryCatalog,
    pub advisories: MemoryAdvisorySource,
    pub config: Config,
    pub options: BuildOptions,
}

impl InputArgs {
    pub fn load(&self) -> Result<Inputs> {
        let content = std::fs::read_to_string(&self.snapshot).map_err(|e| {
            anyhow!(
                "Failed to read snapshot from {}: {}",
                self.snapshot.display(),
                e
            )
        })?;
        let snapshot: Snapshot = serde_yaml::from_str(&content).map_err(|e| {
            anyhow!(
                "Failed to parse snapshot {}: {}",
                self.snapshot.display(),
                e
            )
        })?;

        let config = match &self.config {
            Some(path) => config::from_file(path).map_err(|e| {
                anyhow!("Failed to load config from {}: {}", path.display(), e)
            })?,
            None => Config::default(),
        };

        let options = match self.now {
            Some(now) => BuildOptions {
                now: DateTime::from_timestamp(now, 0)
                    .ok_or_else(|| anyhow!("Invalid --now timestamp: {}", now))?,
            },
            None => BuildOptions::default(),
        };

        let catalog = MemoryCatalog::from_records(snapshot.sources)?;
        let mut advisories = MemoryAdvisorySource::new(snapshot.advisories);
        if let Some(channels) = snapshot.channels {
            advisories = advisories.with_channels(channels);
        }

        log::debug!(
            "Loaded {} sources and {} advisories",
            catalog.len(),
            advisories.len()
        );

        Ok(Inputs {
            catalog,
            advisories,
            config,
            options,
        })
    }
}
