//! # Advisory Revisions
//!
//! Upstream sometimes edits an advisory after it has shipped: packages are
//! added or dropped, or the issue date moves. [`modified_errata`] compares
//! the current upstream state of such advisories with what a plan recorded
//! at build time, so the already-shipped buckets can be re-validated.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::advisory::AdvisorySource;
use crate::catalog::PackageCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::package::Nevra;
use crate::phases::bucketing::is_supported;
use crate::phases::GOLDEN_BUCKET;
use crate::plan::Plan;

/// How one shipped advisory changed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrataRevision {
    pub advisory: String,
    /// Bucket the advisory shipped in.
    pub bucket: i64,
    pub last_modified: DateTime<Utc>,
    /// Sources the advisory now references that the plan did not record.
    pub added: BTreeSet<Nevra>,
    /// Sources the plan recorded that the advisory no longer references.
    pub removed: BTreeSet<Nevra>,
    /// Binaries the catalog does not know.
    pub unresolved: BTreeSet<Nevra>,
    /// Old and new bucket keys derived from the issue date, when it moved.
    pub issue_date_moved: Option<(i64, i64)>,
}

impl ErrataRevision {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.unresolved.is_empty()
            && self.issue_date_moved.is_none()
    }
}

/// Diff every advisory modified after `current` that already shipped in a
/// bucket at or before `current`.
pub fn modified_errata(
    plan: &Plan,
    source: &dyn AdvisorySource,
    catalog: &dyn PackageCatalog,
    config: &Config,
    current: i64,
) -> Result<Vec<ErrataRevision>> {
    let channels = if config.channels.is_empty() {
        source.channels()
    } else {
        config.channels.clone()
    };

    let mut revisions = Vec::new();
    for (name, revision) in source.modified_errata(current)? {
        let Some(bucket) = plan.advisory_bucket(&name) else {
            debug!("Modified advisory {} is not in the plan", name);
            continue;
        };
        if bucket > current {
            debug!("Modified advisory {} has not shipped yet", name);
            continue;
        }

        let mut resolved = BTreeSet::new();
        let mut unresolved = BTreeSet::new();
        for package in revision
            .packages
            .iter()
            .filter(|p| is_supported(p, &channels, &config.arches))
        {
            match catalog.source_of(&package.nevra) {
                Some(found) => {
                    resolved.insert(found.nevra.clone());
                }
                None => {
                    unresolved.insert(package.nevra.clone());
                }
            }
        }

        let recorded = plan.advisory_packages(&name);
        let derived = revision.issue_date.timestamp();
        let issued = if config.first_errata.is_some_and(|first| derived <= first) {
            GOLDEN_BUCKET
        } else {
            derived
        };
        let issue_date_moved = plan
            .issued_key(&name)
            .filter(|old| *old != issued)
            .map(|old| (old, issued));

        let diff = ErrataRevision {
            advisory: name,
            bucket,
            last_modified: revision.last_modified,
            added: resolved.difference(&recorded).cloned().collect(),
            removed: recorded.difference(&resolved).cloned().collect(),
            unresolved,
            issue_date_moved,
        };
        if !diff.is_empty() {
            revisions.push(diff);
        }
    }

    revisions.sort_by(|a, b| a.bucket.cmp(&b.bucket).then_with(|| a.advisory.cmp(&b.advisory)));
    Ok(revisions)
}
