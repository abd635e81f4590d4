//! # Update Plan
//!
//! A [`Plan`] is the frozen output of bucketing and override application: an
//! ordered sequence of buckets, each a set of source packages that ship
//! together, plus the advisories recorded against each bucket.
//!
//! Plans are immutable. The only way to get one is [`Plan::freeze`], which
//! also checks that no source package sits in two buckets at once. Every
//! downstream query (what ships first, what ships after a given moment,
//! which advisories explain a bucket) is answered from the plan alone.

use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::package::Nevra;
pub use crate::phases::AdvisoryDetail;
use crate::phases::{Partition, GOLDEN_BUCKET};

/// The ordered, immutable update plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    #[serde(flatten)]
    partition: Partition,
    #[serde(skip)]
    locations: BTreeMap<Nevra, i64>,
    #[serde(rename = "promoteAfter", skip_serializing_if = "Option::is_none")]
    promote_after: Option<i64>,
}

impl Plan {
    /// Freeze a partition into a plan.
    ///
    /// Fails with `Error::Assertion` if a package appears in more than one
    /// bucket.
    pub fn freeze(partition: Partition, promote_after: Option<i64>) -> Result<Self> {
        let mut locations = BTreeMap::new();
        for (key, nevra) in partition.entries() {
            if let Some(previous) = locations.insert(nevra.clone(), key) {
                return Err(Error::Assertion {
                    message: format!("{} appears in buckets {} and {}", nevra, previous, key),
                });
            }
        }
        Ok(Self {
            partition,
            locations,
            promote_after,
        })
    }

    /// Number of buckets, including the golden bucket.
    pub fn len(&self) -> usize {
        self.partition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition.is_empty()
    }

    /// Bucket keys in ascending order.
    pub fn keys(&self) -> Vec<i64> {
        self.partition.keys().collect()
    }

    /// All buckets in ascending key order.
    pub fn buckets(&self) -> impl Iterator<Item = (i64, &BTreeSet<Nevra>)> {
        self.partition.iter()
    }

    pub fn bucket(&self, key: i64) -> Option<&BTreeSet<Nevra>> {
        self.partition.bucket(key)
    }

    /// Contents of the golden bucket.
    pub fn initial_packages(&self) -> BTreeSet<Nevra> {
        self.partition
            .bucket(GOLDEN_BUCKET)
            .cloned()
            .unwrap_or_default()
    }

    /// Buckets strictly after `current`, in order.
    ///
    /// Each call starts a fresh iteration.
    pub fn iter_after(&self, current: i64) -> impl Iterator<Item = (i64, &BTreeSet<Nevra>)> {
        self.partition.iter().filter(move |(key, _)| *key > current)
    }

    /// Buckets strictly after `current` that may be promoted, i.e. not later
    /// than the configured promote-after bound.
    pub fn iter_promotable(&self, current: i64) -> impl Iterator<Item = (i64, &BTreeSet<Nevra>)> {
        let bound = self.promote_after.unwrap_or(i64::MAX);
        self.iter_after(current).filter(move |(key, _)| *key <= bound)
    }

    /// Advisories recorded against a bucket, in name order.
    pub fn update_detail(&self, key: i64) -> Vec<AdvisoryDetail> {
        self.partition
            .details(key)
            .map(|details| details.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Human-readable summary of a bucket, suitable as a commit message.
    pub fn update_detail_message(&self, key: i64) -> String {
        if key == GOLDEN_BUCKET {
            return "Initial import".to_string();
        }

        let when = DateTime::from_timestamp(key, 0)
            .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| key.to_string());
        let details = self.update_detail(key);
        if details.is_empty() {
            return format!("Update {} ({})", key, when);
        }

        let mut message = format!("Update {} ({})\n", key, when);
        for detail in details {
            message.push_str(&format!("\n{}: {}", detail.name, detail.summary));
        }
        message
    }

    /// Source packages an advisory references.
    pub fn advisory_packages(&self, advisory: &str) -> BTreeSet<Nevra> {
        self.partition
            .advisory_packages(advisory)
            .cloned()
            .unwrap_or_default()
    }

    /// Advisories referencing a source package.
    pub fn advisories_for(&self, nevra: &Nevra) -> BTreeSet<String> {
        self.partition
            .advisories_for(nevra)
            .cloned()
            .unwrap_or_default()
    }

    /// Bucket a source package ships in.
    pub fn bucket_of(&self, nevra: &Nevra) -> Option<i64> {
        self.locations.get(nevra).copied()
    }

    /// Earliest bucket whose details record the advisory, else the earliest
    /// bucket holding one of its packages.
    pub fn advisory_bucket(&self, advisory: &str) -> Option<i64> {
        self.partition
            .keys()
            .find(|key| {
                self.partition
                    .details(*key)
                    .is_some_and(|details| details.iter().any(|d| d.name == advisory))
            })
            .or_else(|| {
                self.partition
                    .advisory_packages(advisory)
                    .into_iter()
                    .flatten()
                    .filter_map(|nevra| self.bucket_of(nevra))
                    .min()
            })
    }

    /// Bucket key the advisory's own issue date mapped to at build time.
    pub fn issued_key(&self, advisory: &str) -> Option<i64> {
        self.partition.issued_key(advisory)
    }

    /// Whether a package was forced into this bucket by an override.
    pub fn is_forced(&self, key: i64, nevra: &Nevra) -> bool {
        self.partition.is_forced(key, nevra)
    }

    pub fn promote_after(&self) -> Option<i64> {
        self.promote_after
    }
}
