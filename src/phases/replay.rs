//! Phase 3: Replay
//!
//! Certifies a frozen [`Plan`] by replaying every bucket, earliest first,
//! against a simulated repository state that maps each package name to the
//! source currently shipping it.
//!
//! ## Checks per bucket
//!
//! - **Duplicates**: two sources sharing a name in one bucket. Only the
//!   newest of them is applied.
//! - **Transitions**: each source is compared with the current source of its
//!   name. Going backwards needs an `allowDowngrades` entry, an equal version
//!   needs a forced inclusion, and binaries that disappear need a removal,
//!   replacement or keep directive. A rejected transition leaves the state
//!   unchanged.
//! - **Obsolescence**: binaries still shipped next to a sibling that
//!   obsoletes them, and live sources whose every binary is obsoleted by
//!   another live source. Each edge and each source is reported once per
//!   replay.
//! - **Removed but still built**: names slated for removal that a live source
//!   still produces.
//!
//! The golden bucket only seeds the state and skips the duplicate and
//! transition checks.
//!
//! Findings never stop the replay. Once every bucket has been visited the
//! replay is either certified or fails with one [`ConsistencyReport`]
//! carrying every finding and a pasteable directive for each.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info};
use serde::Serialize;

use super::GOLDEN_BUCKET;
use crate::catalog::PackageCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::package::Nevra;
use crate::plan::Plan;
use crate::suggestions;
use crate::version::CompareVersions;

/// The kinds of consistency finding, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    Duplicate,
    GoesBackwards,
    ReusesPackage,
    RemovesPackage,
    ObsoleteBinaries,
    ObsoleteSources,
    RemovedShouldBeReplaced,
}

impl FindingKind {
    pub fn label(&self) -> &'static str {
        match self {
            FindingKind::Duplicate => "duplicate",
            FindingKind::GoesBackwards => "goes-backwards",
            FindingKind::ReusesPackage => "reuses-package",
            FindingKind::RemovesPackage => "removes-package",
            FindingKind::ObsoleteBinaries => "obsolete-binaries",
            FindingKind::ObsoleteSources => "obsolete-sources",
            FindingKind::RemovedShouldBeReplaced => "removed-should-be-replaced",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Finding {
    /// Several sources of one name in one bucket, oldest first.
    Duplicate {
        bucket: i64,
        name: String,
        sources: Vec<Nevra>,
    },
    GoesBackwards {
        bucket: i64,
        previous_bucket: i64,
        from: Nevra,
        to: Nevra,
    },
    /// A version equal to the one already shipped.
    ReusesPackage {
        bucket: i64,
        previous_bucket: i64,
        nevra: Nevra,
    },
    /// Binaries of `from` that `to` no longer produces.
    RemovesPackage {
        bucket: i64,
        from: Nevra,
        to: Nevra,
        removed: BTreeSet<String>,
        /// Another live source produces the removed names.
        replaced: bool,
    },
    ObsoleteBinaries {
        bucket: i64,
        source: Nevra,
        obsoleting: String,
        obsoleted: String,
    },
    #[serde(rename = "obsolete-sources")]
    ObsoleteSource {
        bucket: i64,
        source: Nevra,
        obsoleted_by: BTreeSet<Nevra>,
    },
    RemovedShouldBeReplaced {
        bucket: i64,
        name: String,
        source: Nevra,
    },
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::Duplicate { .. } => FindingKind::Duplicate,
            Finding::GoesBackwards { .. } => FindingKind::GoesBackwards,
            Finding::ReusesPackage { .. } => FindingKind::ReusesPackage,
            Finding::RemovesPackage { .. } => FindingKind::RemovesPackage,
            Finding::ObsoleteBinaries { .. } => FindingKind::ObsoleteBinaries,
            Finding::ObsoleteSource { .. } => FindingKind::ObsoleteSources,
            Finding::RemovedShouldBeReplaced { .. } => FindingKind::RemovedShouldBeReplaced,
        }
    }

    pub fn bucket(&self) -> i64 {
        match self {
            Finding::Duplicate { bucket, .. }
            | Finding::GoesBackwards { bucket, .. }
            | Finding::ReusesPackage { bucket, .. }
            | Finding::RemovesPackage { bucket, .. }
            | Finding::ObsoleteBinaries { bucket, .. }
            | Finding::ObsoleteSource { bucket, .. }
            | Finding::RemovedShouldBeReplaced { bucket, .. } => *bucket,
        }
    }

    /// A directive that resolves the finding, as a one-line config document.
    pub fn suggestion(&self) -> String {
        match self {
            Finding::Duplicate {
                bucket, sources, ..
            } => match sources.first() {
                Some(oldest) => suggestions::reorder_source(oldest, *bucket, None),
                None => String::new(),
            },
            Finding::GoesBackwards { bucket, to, .. } => {
                suggestions::reorder_source(to, *bucket, None)
            }
            Finding::ReusesPackage { bucket, nevra, .. } => {
                suggestions::reorder_source(nevra, *bucket, None)
            }
            Finding::RemovesPackage {
                bucket,
                removed,
                replaced,
                ..
            } => {
                if *replaced {
                    suggestions::update_replaces(*bucket, removed)
                } else {
                    suggestions::update_removes(*bucket, removed)
                }
            }
            Finding::ObsoleteBinaries {
                obsoleting,
                obsoleted,
                ..
            } => suggestions::keep_obsolete(obsoleting, obsoleted),
            Finding::ObsoleteSource { bucket, source, .. } => {
                suggestions::remove_obsoleted(*bucket, &source.name)
            }
            Finding::RemovedShouldBeReplaced { bucket, name, .. } => {
                suggestions::update_replaces(*bucket, &BTreeSet::from([name.clone()]))
            }
        }
    }
}

fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Duplicate {
                bucket,
                name,
                sources,
            } => write!(f, "bucket {}: {} provided by {}", bucket, name, join(sources)),
            Finding::GoesBackwards {
                bucket,
                previous_bucket,
                from,
                to,
            } => write!(
                f,
                "bucket {}: {} goes backwards from {} (bucket {}) to {}",
                bucket, to.name, from, previous_bucket, to
            ),
            Finding::ReusesPackage {
                bucket,
                previous_bucket,
                nevra,
            } => write!(
                f,
                "bucket {}: {} reuses the version shipped in bucket {}",
                bucket, nevra, previous_bucket
            ),
            Finding::RemovesPackage {
                bucket,
                from,
                to,
                removed,
                ..
            } => write!(
                f,
                "bucket {}: {} -> {} removes {}",
                bucket,
                from,
                to,
                join(removed)
            ),
            Finding::ObsoleteBinaries {
                bucket,
                source,
                obsoleting,
                obsoleted,
            } => write!(
                f,
                "bucket {}: {} obsoletes {} but both ship from {}",
                bucket, obsoleting, obsoleted, source
            ),
            Finding::ObsoleteSource {
                bucket,
                source,
                obsoleted_by,
            } => write!(
                f,
                "bucket {}: every binary of {} is obsoleted by {}",
                bucket,
                source,
                join(obsoleted_by)
            ),
            Finding::RemovedShouldBeReplaced {
                bucket,
                name,
                source,
            } => write!(
                f,
                "bucket {}: {} is removed but still built by {}",
                bucket, name, source
            ),
        }
    }
}

/// Every finding of a replay, per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    findings: BTreeMap<i64, Vec<Finding>>,
}

impl ConsistencyReport {
    pub fn push(&mut self, finding: Finding) {
        self.findings
            .entry(finding.bucket())
            .or_default()
            .push(finding);
    }

    /// Total number of findings
    pub fn len(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings of one bucket, in discovery order.
    pub fn bucket(&self, key: i64) -> &[Finding] {
        self.findings.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All findings in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.values().flatten()
    }

    pub fn by_kind(&self) -> BTreeMap<FindingKind, Vec<&Finding>> {
        let mut grouped: BTreeMap<FindingKind, Vec<&Finding>> = BTreeMap::new();
        for finding in self.iter() {
            grouped.entry(finding.kind()).or_default().push(finding);
        }
        grouped
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.iter().filter(|f| f.kind() == kind).count()
    }

    /// Distinct suggested directives, in report order.
    pub fn suggestions(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.by_kind()
            .into_values()
            .flatten()
            .map(Finding::suggestion)
            .filter(|line| !line.is_empty() && seen.insert(line.clone()))
            .collect()
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Consistency check failed with {} findings", self.len())?;
        for (kind, findings) in self.by_kind() {
            write!(f, "\n  {} ({}):", kind, findings.len())?;
            for finding in findings {
                write!(f, "\n    {}", finding)?;
                write!(f, "\n      suggest: {}", finding.suggestion())?;
            }
        }
        Ok(())
    }
}

/// Where a replay is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    Idle,
    Replaying(i64),
    Certified,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BucketChange {
    key: i64,
    produced: BTreeSet<String>,
    removed: BTreeSet<String>,
}

/// The simulated end state of a certified plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certification {
    parent: BTreeSet<Nevra>,
    children: BTreeSet<Nevra>,
    live: BTreeMap<String, Nevra>,
    timeline: Vec<BucketChange>,
}

impl Certification {
    /// Sources applied by update buckets.
    pub fn child_packages(&self) -> &BTreeSet<Nevra> {
        &self.children
    }

    /// Sources of the golden bucket.
    pub fn parent_packages(&self) -> &BTreeSet<Nevra> {
        &self.parent
    }

    /// Name → source shipping it at the end of the plan.
    pub fn live(&self) -> &BTreeMap<String, Nevra> {
        &self.live
    }

    /// Binary names removed as of `timestamp` and not produced again since.
    pub fn removed_as_of(&self, timestamp: i64) -> BTreeSet<String> {
        let mut removed = BTreeSet::new();
        for change in self.timeline.iter().filter(|c| c.key <= timestamp) {
            removed.extend(change.removed.iter().cloned());
            for name in &change.produced {
                removed.remove(name);
            }
        }
        removed
    }
}

/// A bucket-by-bucket replay of a plan.
pub struct Replay<'a> {
    plan: &'a Plan,
    catalog: &'a dyn PackageCatalog,
    config: &'a Config,
    comparator: &'a dyn CompareVersions,
    keys: Vec<i64>,
    cursor: usize,
    status: ReplayStatus,
    /// name → (source, bucket it was applied in)
    live: BTreeMap<String, (Nevra, i64)>,
    report: ConsistencyReport,
    seen_edges: BTreeSet<(String, String)>,
    seen_sources: BTreeSet<Nevra>,
    parent: BTreeSet<Nevra>,
    children: BTreeSet<Nevra>,
    timeline: Vec<BucketChange>,
}

impl<'a> Replay<'a> {
    pub fn new(
        plan: &'a Plan,
        catalog: &'a dyn PackageCatalog,
        config: &'a Config,
        comparator: &'a dyn CompareVersions,
    ) -> Self {
        Self {
            plan,
            catalog,
            config,
            comparator,
            keys: plan.keys(),
            cursor: 0,
            status: ReplayStatus::Idle,
            live: BTreeMap::new(),
            report: ConsistencyReport::default(),
            seen_edges: BTreeSet::new(),
            seen_sources: BTreeSet::new(),
            parent: BTreeSet::new(),
            children: BTreeSet::new(),
            timeline: Vec::new(),
        }
    }

    pub fn status(&self) -> ReplayStatus {
        self.status
    }

    pub fn report(&self) -> &ConsistencyReport {
        &self.report
    }

    /// Replay the next bucket and return its key, or settle the final status
    /// and return `None` once every bucket has been replayed.
    pub fn step(&mut self) -> Option<i64> {
        let Some(&key) = self.keys.get(self.cursor) else {
            self.status = if self.report.is_empty() {
                ReplayStatus::Certified
            } else {
                ReplayStatus::Failed
            };
            return None;
        };
        self.cursor += 1;
        self.status = ReplayStatus::Replaying(key);

        let mut change = BucketChange {
            key,
            ..BucketChange::default()
        };
        if key == GOLDEN_BUCKET {
            self.seed(key, &mut change);
        } else {
            self.apply(key, &mut change);
        }
        self.apply_removals(key, &mut change);
        self.scan_obsoletes(key);
        self.check_removed_still_built(key);

        debug!(
            "Replayed bucket {}: {} findings",
            key,
            self.report.bucket(key).len()
        );
        self.timeline.push(change);
        Some(key)
    }

    /// Replay every remaining bucket and certify the plan.
    pub fn finish(mut self) -> Result<Certification> {
        while self.step().is_some() {}

        if self.status == ReplayStatus::Failed {
            return Err(Error::Consistency(Box::new(self.report)));
        }
        info!("Certified {} buckets", self.keys.len());
        Ok(Certification {
            parent: self.parent,
            children: self.children,
            live: self
                .live
                .into_iter()
                .map(|(name, (nevra, _))| (name, nevra))
                .collect(),
            timeline: self.timeline,
        })
    }

    fn seed(&mut self, key: i64, change: &mut BucketChange) {
        let plan = self.plan;
        let Some(packages) = plan.bucket(key) else {
            return;
        };
        for nevra in packages {
            self.parent.insert(nevra.clone());
            let newer = match self.live.get(&nevra.name) {
                Some((current, _)) => self.comparator.is_newer(nevra, current),
                None => true,
            };
            if newer {
                self.live.insert(nevra.name.clone(), (nevra.clone(), key));
            }
        }
        for (nevra, _) in self.live.values() {
            change.produced.extend(self.catalog.binary_names(nevra));
        }
    }

    fn apply(&mut self, key: i64, change: &mut BucketChange) {
        let plan = self.plan;
        let Some(packages) = plan.bucket(key) else {
            return;
        };

        let mut by_name: BTreeMap<&str, Vec<&Nevra>> = BTreeMap::new();
        for nevra in packages {
            by_name.entry(nevra.name.as_str()).or_default().push(nevra);
        }

        for (name, mut group) in by_name {
            group.sort_by(|a, b| self.comparator.compare(a, b).then_with(|| a.cmp(b)));
            let Some(newest) = group.last().copied() else {
                continue;
            };
            if group.len() > 1 {
                self.report.push(Finding::Duplicate {
                    bucket: key,
                    name: name.to_string(),
                    sources: group.iter().map(|n| (*n).clone()).collect(),
                });
            }
            self.transition(key, newest, change);
        }
    }

    fn transition(&mut self, key: i64, new: &Nevra, change: &mut BucketChange) {
        let Some((current, previous_bucket)) = self.live.get(&new.name).cloned() else {
            self.advance(key, new, change);
            return;
        };

        match self.comparator.compare(new, &current) {
            Ordering::Equal if !self.plan.is_forced(key, new) => {
                self.report.push(Finding::ReusesPackage {
                    bucket: key,
                    previous_bucket,
                    nevra: new.clone(),
                });
                return;
            }
            Ordering::Less if !self.config.allows_downgrade(key, &current, new) => {
                self.report.push(Finding::GoesBackwards {
                    bucket: key,
                    previous_bucket,
                    from: current,
                    to: new.clone(),
                });
                return;
            }
            _ => {}
        }

        let produced = self.catalog.binary_names(new);
        let dropped: BTreeSet<String> = self
            .catalog
            .binary_names(&current)
            .difference(&produced)
            .cloned()
            .collect();
        let unexpected: BTreeSet<String> = dropped
            .iter()
            .filter(|name| !self.config.expects_removal(key, name))
            .cloned()
            .collect();

        if !unexpected.is_empty() {
            let replaced = unexpected.iter().any(|name| self.built_elsewhere(name, &new.name));
            self.report.push(Finding::RemovesPackage {
                bucket: key,
                from: current,
                to: new.clone(),
                removed: unexpected,
                replaced,
            });
            return;
        }

        change.removed.extend(dropped);
        self.advance(key, new, change);
    }

    fn advance(&mut self, key: i64, new: &Nevra, change: &mut BucketChange) {
        change.produced.extend(self.catalog.binary_names(new));
        self.children.insert(new.clone());
        self.live.insert(new.name.clone(), (new.clone(), key));
    }

    /// Whether a live source other than `owner` produces a binary name.
    fn built_elsewhere(&self, binary: &str, owner: &str) -> bool {
        self.live
            .values()
            .filter(|(source, _)| source.name != owner)
            .any(|(source, _)| self.catalog.binary_names(source).contains(binary))
    }

    fn apply_removals(&mut self, key: i64, change: &mut BucketChange) {
        change.removed.extend(self.config.removes(key).cloned());

        for name in self.config.removed_obsoleted(key) {
            match self.live.remove(name) {
                Some((source, _)) => {
                    debug!("Removed obsoleted source {} at bucket {}", source, key);
                    change.removed.extend(self.catalog.binary_names(&source));
                }
                None => debug!("Obsoleted source {} is not live at bucket {}", name, key),
            }
        }
    }

    fn scan_obsoletes(&mut self, key: i64) {
        let mut obsoleted_by: BTreeMap<String, BTreeSet<Nevra>> = BTreeMap::new();

        for (source, _) in self.live.values() {
            let binaries = self.catalog.binaries_of(source);
            let names: BTreeSet<&str> = binaries.iter().map(|b| b.nevra.name.as_str()).collect();
            for binary in &binaries {
                for target in &binary.obsoletes {
                    if *target == binary.nevra.name
                        || self.config.keeps_obsolete(&binary.nevra.name, target)
                    {
                        continue;
                    }
                    if names.contains(target.as_str()) {
                        let edge = (binary.nevra.name.clone(), target.clone());
                        if self.seen_edges.insert(edge) {
                            self.report.push(Finding::ObsoleteBinaries {
                                bucket: key,
                                source: source.clone(),
                                obsoleting: binary.nevra.name.clone(),
                                obsoleted: target.clone(),
                            });
                        }
                    } else {
                        obsoleted_by
                            .entry(target.clone())
                            .or_default()
                            .insert(source.clone());
                    }
                }
            }
        }

        for (source, _) in self.live.values() {
            let names = self.catalog.binary_names(source);
            if names.is_empty() || !names.iter().all(|n| obsoleted_by.contains_key(n)) {
                continue;
            }
            let by: BTreeSet<Nevra> = names
                .iter()
                .filter_map(|n| obsoleted_by.get(n))
                .flatten()
                .filter(|other| !self.config.keeps_obsolete_source(&other.name, &source.name))
                .cloned()
                .collect();
            if by.is_empty() {
                continue;
            }
            if self.seen_sources.insert(source.clone()) {
                self.report.push(Finding::ObsoleteSource {
                    bucket: key,
                    source: source.clone(),
                    obsoleted_by: by,
                });
            }
        }
    }

    fn check_removed_still_built(&mut self, key: i64) {
        let mut findings = Vec::new();
        for name in self.config.removes(key) {
            let builder = self
                .live
                .values()
                .find(|(source, _)| self.catalog.binary_names(source).contains(name));
            if let Some((source, _)) = builder {
                findings.push(Finding::RemovedShouldBeReplaced {
                    bucket: key,
                    name: name.clone(),
                    source: source.clone(),
                });
            }
        }
        for finding in findings {
            self.report.push(finding);
        }
    }
}

/// Execute Phase 3: replay the plan and certify it.
pub fn execute(
    plan: &Plan,
    catalog: &dyn PackageCatalog,
    config: &Config,
    comparator: &dyn CompareVersions,
) -> Result<Certification> {
    Replay::new(plan, catalog, config, comparator).finish()
}
