//! # Advisory Source
//!
//! Advisories (errata) are upstream records naming a set of binaries that
//! were updated together. The scheduler consumes them through the
//! [`AdvisorySource`] trait, which hands over the whole stream in ascending
//! issue-date order in a single front-loaded read.
//!
//! [`MemoryAdvisorySource`] keeps the advisories in memory and backs the CLI
//! snapshot format and the tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::package::Nevra;

/// One binary referenced by an advisory, in one distribution channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvisoryPackage {
    pub nevra: Nevra,
    pub channel: String,
}

/// An upstream advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Advisory {
    pub name: String,
    #[serde(rename = "issueDate")]
    pub issue_date: DateTime<Utc>,
    /// Defaults to the issue date.
    #[serde(default, rename = "lastModified")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub packages: Vec<AdvisoryPackage>,
}

impl Advisory {
    /// Bucket key derived from the issue date: UTC epoch seconds.
    pub fn bucket_key(&self) -> i64 {
        self.issue_date.timestamp()
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.issue_date)
    }
}

/// The current upstream state of an advisory that changed after a given
/// moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryRevision {
    pub last_modified: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub packages: BTreeSet<AdvisoryPackage>,
}

/// Supplier of advisories.
pub trait AdvisorySource {
    /// Every advisory, in ascending issue-date order.
    fn iter_by_issue_date(&self) -> Result<Vec<Advisory>>;

    /// Advisories modified strictly after `since` (epoch seconds), keyed by
    /// advisory name.
    fn modified_errata(&self, since: i64) -> Result<BTreeMap<String, AdvisoryRevision>>;

    /// Distribution channels this source carries.
    fn channels(&self) -> BTreeSet<String>;

    /// Release any cached advisory data.
    fn cleanup(&mut self);
}

/// Advisories held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdvisorySource {
    advisories: Vec<Advisory>,
    channels: BTreeSet<String>,
}

impl MemoryAdvisorySource {
    /// Build a source from advisories in any order.
    ///
    /// The channel set is every channel mentioned by any advisory.
    pub fn new(advisories: Vec<Advisory>) -> Self {
        let channels = advisories
            .iter()
            .flat_map(|a| a.packages.iter().map(|p| p.channel.clone()))
            .collect();
        Self {
            advisories,
            channels,
        }
    }

    /// Replace the advertised channel set.
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Number of advisories still held
    pub fn len(&self) -> usize {
        self.advisories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }
}

impl AdvisorySource for MemoryAdvisorySource {
    fn iter_by_issue_date(&self) -> Result<Vec<Advisory>> {
        let mut ordered = self.advisories.clone();
        // Stable on the name so equal issue dates still come out in a fixed order.
        ordered.sort_by(|a, b| {
            a.issue_date
                .cmp(&b.issue_date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(ordered)
    }

    fn modified_errata(&self, since: i64) -> Result<BTreeMap<String, AdvisoryRevision>> {
        Ok(self
            .advisories
            .iter()
            .filter(|a| a.last_modified().timestamp() > since)
            .map(|a| {
                (
                    a.name.clone(),
                    AdvisoryRevision {
                        last_modified: a.last_modified(),
                        issue_date: a.issue_date,
                        packages: a.packages.iter().cloned().collect(),
                    },
                )
            })
            .collect())
    }

    fn channels(&self) -> BTreeSet<String> {
        self.channels.clone()
    }

    fn cleanup(&mut self) {
        self.advisories.clear();
        self.advisories.shrink_to_fit();
    }
}

/// Advisory in the `base` channel issued at `issued` epoch seconds.
#[cfg(test)]
pub(crate) fn advisory_at(name: &str, issued: i64, binaries: &[&str]) -> Advisory {
    Advisory {
        name: name.to_string(),
        issue_date: DateTime::from_timestamp(issued, 0).unwrap_or_default(),
        last_modified: None,
        synopsis: format!("{name} update"),
        description: String::new(),
        packages: binaries
            .iter()
            .map(|binary| AdvisoryPackage {
                nevra: crate::package::nevra(binary),
                channel: "base".to_string(),
            })
            .collect(),
    }
}
