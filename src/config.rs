//! # Configuration and Override Directives
//!
//! This module defines the YAML document that configures a scheduling run:
//! the time bounds, the supported channels and architectures, and the list
//! of manual override directives the operator has accumulated.
//!
//! ## Key Components
//!
//! - **`Config`**: The whole document. Every key is optional; an empty
//!   document is a valid configuration with no overrides.
//!
//! - **Directive structs** (`ReorderBucket`, `ReorderAdvisory`,
//!   `ReorderSource`, `AddSource`, `AllowDowngrade`): one entry of a
//!   list-valued directive.
//!
//! ## Parsing
//!
//! `parse` reads a YAML string; `from_file` reads a path. Unknown keys are
//! rejected, and the resulting error carries a "did you mean" hint when the
//! offending key is close to a known one, since a misspelled directive would
//! otherwise be silently ignored.
//!
//! ```
//! use errata_scheduler::config;
//!
//! let config = config::parse(r#"
//! lastErrata: 1300000000
//! mergeBuckets:
//!   - [1293840000, 1293926400]
//! keepObsolete:
//!   - [a-bin, b-bin]
//! "#).unwrap();
//! assert_eq!(config.merge_buckets.len(), 1);
//! assert!(config.keeps_obsolete("a-bin", "b-bin"));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package::Nevra;
use crate::suggestions;

/// Move a whole bucket to a new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderBucket {
    pub source: i64,
    pub dest: i64,
}

/// Move the packages of one advisory from one bucket to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderAdvisory {
    pub advisory: String,
    pub source: i64,
    pub dest: i64,
}

/// Move one source package between buckets, or drop it when `dest` is null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderSource {
    pub nevra: Nevra,
    pub source: i64,
    #[serde(default)]
    pub dest: Option<i64>,
}

/// Force a known source package into a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSource {
    pub nevra: Nevra,
    pub bucket: i64,
}

/// Permit a version to go backwards in one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowDowngrade {
    pub bucket: i64,
    pub from: Nevra,
    pub to: Nevra,
}

/// The scheduler configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Config {
    /// Supported distribution channels. Empty means every channel the
    /// advisory source advertises.
    pub channels: BTreeSet<String>,
    /// Supported binary architectures. Empty means all.
    pub arches: BTreeSet<String>,
    /// Golden-bucket threshold; advisories at or before it fold into bucket 0.
    pub first_errata: Option<i64>,
    /// Buckets after this key are discarded.
    pub last_errata: Option<i64>,
    /// Upper bound for buckets handed to promotion.
    pub promote_after: Option<i64>,

    /// Advisories whose unresolvable or empty package data is tolerated.
    pub broken_errata: BTreeSet<String>,
    /// Source packages allowed to ship without a covering advisory.
    pub allow_missing_errata: BTreeSet<Nevra>,
    /// Explicit bucket for partial-rebuild sources.
    pub extra_buckets: BTreeMap<Nevra, i64>,

    pub ignore_sources: Vec<Nevra>,
    pub merge_buckets: Vec<Vec<i64>>,
    pub reorder_buckets: Vec<ReorderBucket>,
    pub reorder_advisories: Vec<ReorderAdvisory>,
    pub reorder_sources: Vec<ReorderSource>,
    pub add_sources: Vec<AddSource>,

    /// `[obsoleting, obsoleted]` binary-name edges that may coexist.
    pub keep_obsolete: BTreeSet<(String, String)>,
    /// `[obsoleting, obsoleted]` source-name pairs that may coexist.
    pub keep_obsolete_source: BTreeSet<(String, String)>,
    /// Binary names allowed to disappear from their source at any bucket.
    pub keep_removed: BTreeSet<String>,
    pub allow_downgrades: Vec<AllowDowngrade>,
    /// Binary names expected to be removed, per bucket.
    pub update_removes_packages: BTreeMap<i64, BTreeSet<String>>,
    /// Binary names expected to be replaced by another package, per bucket.
    pub update_replaces_packages: BTreeMap<i64, BTreeSet<String>>,
    /// Source names dropped from the repository because they are obsoleted,
    /// per bucket.
    pub remove_obsoleted: BTreeMap<i64, BTreeSet<String>>,
}

/// Every key accepted anywhere in the document.
pub const KNOWN_KEYS: &[&str] = &[
    "channels",
    "arches",
    "firstErrata",
    "lastErrata",
    "promoteAfter",
    "brokenErrata",
    "allowMissingErrata",
    "extraBuckets",
    "ignoreSources",
    "mergeBuckets",
    "reorderBuckets",
    "reorderAdvisories",
    "reorderSources",
    "addSources",
    "keepObsolete",
    "keepObsoleteSource",
    "keepRemoved",
    "allowDowngrades",
    "updateRemovesPackages",
    "updateReplacesPackages",
    "removeObsoleted",
    "advisory",
    "source",
    "dest",
    "nevra",
    "bucket",
    "from",
    "to",
];

impl Config {
    pub fn is_broken_errata(&self, advisory: &str) -> bool {
        self.broken_errata.contains(advisory)
    }

    pub fn allows_downgrade(&self, bucket: i64, from: &Nevra, to: &Nevra) -> bool {
        self.allow_downgrades
            .iter()
            .any(|d| d.bucket == bucket && &d.from == from && &d.to == to)
    }

    /// Whether a binary name may vanish from its source at `bucket`.
    pub fn expects_removal(&self, bucket: i64, name: &str) -> bool {
        self.keep_removed.contains(name)
            || self
                .update_removes_packages
                .get(&bucket)
                .is_some_and(|names| names.contains(name))
            || self
                .update_replaces_packages
                .get(&bucket)
                .is_some_and(|names| names.contains(name))
    }

    pub fn removes(&self, bucket: i64) -> impl Iterator<Item = &String> {
        self.update_removes_packages
            .get(&bucket)
            .into_iter()
            .flatten()
    }

    pub fn removed_obsoleted(&self, bucket: i64) -> impl Iterator<Item = &String> {
        self.remove_obsoleted.get(&bucket).into_iter().flatten()
    }

    pub fn keeps_obsolete(&self, obsoleting: &str, obsoleted: &str) -> bool {
        self.keep_obsolete
            .contains(&(obsoleting.to_string(), obsoleted.to_string()))
    }

    pub fn keeps_obsolete_source(&self, obsoleting: &str, obsoleted: &str) -> bool {
        self.keep_obsolete_source
            .contains(&(obsoleting.to_string(), obsoleted.to_string()))
    }
}

/// Parses a YAML string into a `Config`.
///
/// An empty document yields the default configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }

    serde_yaml::from_str::<Config>(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = unknown_key(&message).and_then(suggestions::similar_directive);
        Error::ConfigParse { message, hint }
    })
}

/// Parse a `Config` from a YAML file path
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Pull the offending key out of serde's "unknown field `x`" message.
fn unknown_key(message: &str) -> Option<&str> {
    let rest = message.split_once("unknown field `")?.1;
    rest.split_once('`').map(|(key, _)| key)
}
