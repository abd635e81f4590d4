//! Implementation of the three phases of an errata-ordered scheduling run.
//!
//! ## Overview
//!
//! A run follows 3 phases:
//! 1. Bucketing - Partition every source package into timestamp-keyed buckets
//!    driven by the advisory stream
//! 2. Overrides - Apply the operator's manual corrections in a fixed order
//! 3. Replay - Simulate the ordered buckets from the start and certify the plan
//!
//! Phases 1 and 2 work on a [`Partition`], which each step takes by value and
//! hands back, so any step can be exercised on its own. The result is frozen
//! into a [`crate::plan::Plan`] before phase 3 reads it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::package::Nevra;

// Phase modules
pub mod bucketing;
pub mod orchestrator;
pub mod overrides;
pub mod replay;

pub use bucketing as phase1;
pub use overrides as phase2;
pub use replay as phase3;

/// Key of the golden bucket holding the initial import.
pub const GOLDEN_BUCKET: i64 = 0;

/// One advisory recorded against a bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AdvisoryDetail {
    pub name: String,
    pub summary: String,
}

/// Working bucket map shared by the bucketing and override phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    buckets: BTreeMap<i64, BTreeSet<Nevra>>,
    details: BTreeMap<i64, BTreeSet<AdvisoryDetail>>,
    #[serde(skip)]
    advisory_packages: BTreeMap<String, BTreeSet<Nevra>>,
    #[serde(skip)]
    package_advisories: BTreeMap<Nevra, BTreeSet<String>>,
    /// Advisory name → bucket key derived from its issue date.
    #[serde(skip)]
    issued: BTreeMap<String, i64>,
    /// Packages pulled into a bucket by a forced inclusion.
    #[serde(skip)]
    forced: BTreeMap<i64, BTreeSet<Nevra>>,
}

/// Everything stored under one bucket key, detached from the partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketContents {
    pub packages: BTreeSet<Nevra>,
    pub details: BTreeSet<AdvisoryDetail>,
    pub forced: BTreeSet<Nevra>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.buckets.contains_key(&key)
    }

    /// Bucket keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.keys().copied()
    }

    pub fn bucket(&self, key: i64) -> Option<&BTreeSet<Nevra>> {
        self.buckets.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &BTreeSet<Nevra>)> {
        self.buckets.iter().map(|(key, packages)| (*key, packages))
    }

    pub fn details(&self, key: i64) -> Option<&BTreeSet<AdvisoryDetail>> {
        self.details.get(&key)
    }

    /// Add a package to a bucket, creating the bucket if needed.
    pub fn insert(&mut self, key: i64, nevra: Nevra) {
        self.buckets.entry(key).or_default().insert(nevra);
    }

    /// Remove a package from a bucket; empty buckets disappear.
    pub fn remove(&mut self, key: i64, nevra: &Nevra) -> bool {
        let Some(packages) = self.buckets.get_mut(&key) else {
            return false;
        };
        let removed = packages.remove(nevra);
        if let Some(forced) = self.forced.get_mut(&key) {
            forced.remove(nevra);
        }
        if packages.is_empty() {
            self.buckets.remove(&key);
            self.details.remove(&key);
            self.forced.remove(&key);
        }
        removed
    }

    /// Bucket currently holding a package.
    pub fn bucket_of(&self, nevra: &Nevra) -> Option<i64> {
        self.buckets
            .iter()
            .find(|(_, packages)| packages.contains(nevra))
            .map(|(key, _)| *key)
    }

    pub fn add_detail(&mut self, key: i64, detail: AdvisoryDetail) {
        self.details.entry(key).or_default().insert(detail);
    }

    /// Move the detail record of one advisory between buckets.
    pub fn move_detail(&mut self, advisory: &str, from: i64, to: i64) {
        let Some(details) = self.details.get_mut(&from) else {
            return;
        };
        let moved: Vec<AdvisoryDetail> = details
            .iter()
            .filter(|d| d.name == advisory)
            .cloned()
            .collect();
        for detail in &moved {
            details.remove(detail);
        }
        for detail in moved {
            self.details.entry(to).or_default().insert(detail);
        }
        if self.details.get(&from).is_some_and(BTreeSet::is_empty) {
            self.details.remove(&from);
        }
    }

    /// Move a package between buckets together with the detail records of
    /// its advisories. A record also stays on `from` while another package
    /// of that advisory is still there.
    pub fn move_package(&mut self, nevra: &Nevra, from: i64, to: i64) -> bool {
        let advisories = self.advisories_for(nevra).cloned().unwrap_or_default();
        let carried: Vec<AdvisoryDetail> = self
            .details(from)
            .into_iter()
            .flatten()
            .filter(|d| advisories.contains(&d.name))
            .cloned()
            .collect();

        if !self.remove(from, nevra) {
            return false;
        }
        self.insert(to, nevra.clone());

        for detail in carried {
            let still_shipped = self.advisory_packages(&detail.name).is_some_and(|members| {
                self.bucket(from)
                    .is_some_and(|packages| members.iter().any(|m| packages.contains(m)))
            });
            if !still_shipped {
                if let Some(details) = self.details.get_mut(&from) {
                    details.remove(&detail);
                    if details.is_empty() {
                        self.details.remove(&from);
                    }
                }
            }
            self.add_detail(to, detail);
        }
        true
    }

    /// Detach everything stored under a key.
    pub fn take_bucket(&mut self, key: i64) -> Option<BucketContents> {
        let packages = self.buckets.remove(&key)?;
        Some(BucketContents {
            packages,
            details: self.details.remove(&key).unwrap_or_default(),
            forced: self.forced.remove(&key).unwrap_or_default(),
        })
    }

    /// Merge detached contents into a key.
    pub fn put_bucket(&mut self, key: i64, contents: BucketContents) {
        if contents.packages.is_empty() {
            return;
        }
        self.buckets
            .entry(key)
            .or_default()
            .extend(contents.packages);
        if !contents.details.is_empty() {
            self.details.entry(key).or_default().extend(contents.details);
        }
        if !contents.forced.is_empty() {
            self.forced.entry(key).or_default().extend(contents.forced);
        }
    }

    /// Keep only buckets whose key satisfies the predicate; returns the
    /// dropped keys.
    pub fn retain_keys<F: Fn(i64) -> bool>(&mut self, keep: F) -> Vec<i64> {
        let dropped: Vec<i64> = self.keys().filter(|key| !keep(*key)).collect();
        for key in &dropped {
            self.take_bucket(*key);
        }
        dropped
    }

    /// Record that an advisory references a source package.
    pub fn link(&mut self, advisory: &str, nevra: &Nevra) {
        self.advisory_packages
            .entry(advisory.to_string())
            .or_default()
            .insert(nevra.clone());
        self.package_advisories
            .entry(nevra.clone())
            .or_default()
            .insert(advisory.to_string());
    }

    /// Strip a package from every advisory's membership.
    pub fn unlink_package(&mut self, nevra: &Nevra) {
        let Some(advisories) = self.package_advisories.remove(nevra) else {
            return;
        };
        for advisory in advisories {
            if let Some(packages) = self.advisory_packages.get_mut(&advisory) {
                packages.remove(nevra);
            }
        }
    }

    pub fn advisory_packages(&self, advisory: &str) -> Option<&BTreeSet<Nevra>> {
        self.advisory_packages.get(advisory)
    }

    pub fn advisories_for(&self, nevra: &Nevra) -> Option<&BTreeSet<String>> {
        self.package_advisories.get(nevra)
    }

    pub fn record_issue(&mut self, advisory: &str, key: i64) {
        self.issued.insert(advisory.to_string(), key);
    }

    /// Bucket key the advisory's own issue date maps to.
    pub fn issued_key(&self, advisory: &str) -> Option<i64> {
        self.issued.get(advisory).copied()
    }

    pub fn mark_forced(&mut self, key: i64, nevra: &Nevra) {
        self.forced.entry(key).or_default().insert(nevra.clone());
    }

    pub fn is_forced(&self, key: i64, nevra: &Nevra) -> bool {
        self.forced
            .get(&key)
            .is_some_and(|forced| forced.contains(nevra))
    }

    /// Every package in every bucket, with its key.
    pub fn entries(&self) -> impl Iterator<Item = (i64, &Nevra)> {
        self.buckets
            .iter()
            .flat_map(|(key, packages)| packages.iter().map(move |p| (*key, p)))
    }
}

#[cfg(test)]
mod partition_tests {
    use super::*;
    use crate::package::nevra;

    fn detail(name: &str) -> AdvisoryDetail {
        AdvisoryDetail {
            name: name.to_string(),
            summary: format!("{name} summary"),
        }
    }

    #[test]
    fn test_insert_and_locate() {
        let mut partition = Partition::new();
        partition.insert(10, nevra("foo-1-1.src"));
        partition.insert(20, nevra("bar-1-1.src"));

        assert_eq!(partition.len(), 2);
        assert_eq!(partition.bucket_of(&nevra("bar-1-1.src")), Some(20));
        assert_eq!(partition.bucket_of(&nevra("baz-1-1.src")), None);
        assert_eq!(partition.keys().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn test_remove_last_package_drops_bucket() {
        let mut partition = Partition::new();
        partition.insert(10, nevra("foo-1-1.src"));
        partition.add_detail(10, detail("ADV-1"));

        assert!(partition.remove(10, &nevra("foo-1-1.src")));
        assert!(!partition.contains_key(10));
        assert!(partition.details(10).is_none());
        assert!(!partition.remove(10, &nevra("foo-1-1.src")));
    }

    #[test]
    fn test_take_and_put_bucket_carries_details_and_forced() {
        let mut partition = Partition::new();
        partition.insert(10, nevra("foo-1-1.src"));
        partition.add_detail(10, detail("ADV-1"));
        partition.mark_forced(10, &nevra("foo-1-1.src"));

        let contents = partition.take_bucket(10).unwrap();
        partition.put_bucket(30, contents);

        assert!(!partition.contains_key(10));
        assert!(partition.is_forced(30, &nevra("foo-1-1.src")));
        assert_eq!(partition.details(30).unwrap().len(), 1);
    }

    #[test]
    fn test_move_package_carries_details() {
        let mut partition = Partition::new();
        partition.insert(10, nevra("foo-1-1.src"));
        partition.insert(10, nevra("bar-1-1.src"));
        partition.add_detail(10, detail("ADV-1"));
        partition.add_detail(10, detail("ADV-2"));
        partition.link("ADV-1", &nevra("foo-1-1.src"));
        partition.link("ADV-1", &nevra("bar-1-1.src"));
        partition.link("ADV-2", &nevra("foo-1-1.src"));

        assert!(partition.move_package(&nevra("foo-1-1.src"), 10, 20));
        assert_eq!(partition.bucket_of(&nevra("foo-1-1.src")), Some(20));
        // bar still ships ADV-1 from bucket 10
        assert_eq!(
            partition.details(10).unwrap(),
            &BTreeSet::from([detail("ADV-1")])
        );
        assert_eq!(partition.details(20).unwrap().len(), 2);

        assert!(partition.move_package(&nevra("bar-1-1.src"), 10, 20));
        assert!(!partition.contains_key(10));
        assert!(partition.details(10).is_none());
        assert!(!partition.move_package(&nevra("bar-1-1.src"), 10, 20));
    }

    #[test]
    fn test_move_detail() {
        let mut partition = Partition::new();
        partition.insert(10, nevra("foo-1-1.src"));
        partition.add_detail(10, detail("ADV-1"));
        partition.add_detail(10, detail("ADV-2"));

        partition.move_detail("ADV-2", 10, 20);
        assert_eq!(partition.details(10).unwrap().len(), 1);
        assert!(partition.details(20).unwrap().contains(&detail("ADV-2")));

        partition.move_detail("ADV-1", 10, 20);
        assert!(partition.details(10).is_none());
    }

    #[test]
    fn test_link_and_unlink() {
        let mut partition = Partition::new();
        partition.link("ADV-1", &nevra("foo-1-1.src"));
        partition.link("ADV-2", &nevra("foo-1-1.src"));
        partition.link("ADV-2", &nevra("bar-1-1.src"));

        assert_eq!(partition.advisories_for(&nevra("foo-1-1.src")).unwrap().len(), 2);

        partition.unlink_package(&nevra("foo-1-1.src"));
        assert!(partition.advisories_for(&nevra("foo-1-1.src")).is_none());
        assert!(partition.advisory_packages("ADV-1").unwrap().is_empty());
        assert_eq!(partition.advisory_packages("ADV-2").unwrap().len(), 1);
    }

    #[test]
    fn test_retain_keys_reports_dropped() {
        let mut partition = Partition::new();
        for key in [0, 10, 20, 30] {
            partition.insert(key, nevra(&format!("p{key}-1-1.src")));
        }
        let dropped = partition.retain_keys(|key| key <= 15);
        assert_eq!(dropped, vec![20, 30]);
        assert_eq!(partition.keys().collect::<Vec<_>>(), vec![0, 10]);
    }
}
