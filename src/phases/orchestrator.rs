//! Orchestrator for a complete scheduling run
//!
//! Runs the phases as two explicit steps: [`build`] produces an immutable
//! [`Plan`], then [`validate`] replays it. Nothing is computed behind the
//! caller's back; every query goes through the plan returned by `build`.

use chrono::{DateTime, Utc};
use log::info;

use super::{phase1, phase2, phase3};
use crate::advisory::AdvisorySource;
use crate::catalog::PackageCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::phases::replay::Certification;
use crate::plan::Plan;
use crate::version::RpmVersionComparator;

/// Inputs of a build that do not come from the configuration document.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Buckets later than this moment are not exposed.
    pub now: DateTime<Utc>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}

/// Build the update plan (Phases 1-2)
///
/// 1. Read the whole advisory stream and partition the catalog into buckets
/// 2. Release the advisory source's cached data
/// 3. Apply the override directives
/// 4. Freeze the result
pub fn build(
    catalog: &dyn PackageCatalog,
    source: &mut dyn AdvisorySource,
    config: &Config,
    options: &BuildOptions,
) -> Result<Plan> {
    let channels = if config.channels.is_empty() {
        source.channels()
    } else {
        config.channels.clone()
    };

    // Phase 1: Bucketing
    let advisories = source.iter_by_issue_date()?;
    let partition = phase1::execute(
        catalog,
        &advisories,
        &channels,
        config,
        &RpmVersionComparator,
    )?;
    drop(advisories);
    source.cleanup();

    // Phase 2: Overrides
    let partition = phase2::execute(partition, catalog, config, options.now.timestamp())?;

    let plan = Plan::freeze(partition, config.promote_after)?;
    info!("Built plan with {} buckets", plan.len());
    Ok(plan)
}

/// Replay a plan and certify it (Phase 3)
pub fn validate(plan: &Plan, catalog: &dyn PackageCatalog, config: &Config) -> Result<Certification> {
    phase3::execute(plan, catalog, config, &RpmVersionComparator)
}

/// Build and certify in one go.
///
/// Fails with `Error::Consistency` when the replay finds anything, in which
/// case no bucket of the plan should be handed downstream.
pub fn sanity_check_order(
    catalog: &dyn PackageCatalog,
    source: &mut dyn AdvisorySource,
    config: &Config,
    options: &BuildOptions,
) -> Result<(Plan, Certification)> {
    let plan = build(catalog, source, config, options)?;
    let certification = validate(&plan, catalog, config)?;
    Ok((plan, certification))
}
