//! # Errata Scheduler Library
//!
//! This library turns an unordered catalog of source packages and a
//! time-ordered stream of update advisories ("errata") into a deterministic,
//! time-bucketed update plan, then certifies that plan by replaying it from
//! the beginning. It backs the `errata-scheduler` command-line tool but is
//! meant to be embedded by whatever pipeline builds and promotes the packages.
//!
//! ## Quick Example
//!
//! ```
//! use errata_scheduler::advisory::{Advisory, AdvisoryPackage, MemoryAdvisorySource};
//! use errata_scheduler::catalog::{BinaryRecord, MemoryCatalog, SourceRecord};
//! use errata_scheduler::config::Config;
//! use errata_scheduler::phases::orchestrator::{build, validate, BuildOptions};
//!
//! let foo: errata_scheduler::package::Nevra = "foo-1.2-1.x86_64".parse().unwrap();
//! let catalog = MemoryCatalog::from_records(vec![SourceRecord {
//!     nevra: "foo-1.2-1.src".parse().unwrap(),
//!     build_time: 1_293_800_000,
//!     binaries: vec![BinaryRecord {
//!         nevra: foo.clone(),
//!         location: None,
//!         obsoletes: Default::default(),
//!         build_time: None,
//!     }],
//! }])
//! .unwrap();
//!
//! let mut advisories = MemoryAdvisorySource::new(vec![Advisory {
//!     name: "ADV-1".to_string(),
//!     issue_date: "2011-01-01T00:00:00Z".parse().unwrap(),
//!     last_modified: None,
//!     synopsis: "foo update".to_string(),
//!     description: String::new(),
//!     packages: vec![AdvisoryPackage { nevra: foo, channel: "base".to_string() }],
//! }]);
//!
//! let config = Config::default();
//! let plan = build(&catalog, &mut advisories, &config, &BuildOptions::default()).unwrap();
//! assert_eq!(plan.keys(), vec![1_293_840_000]);
//! assert_eq!(plan.update_detail(1_293_840_000)[0].name, "ADV-1");
//!
//! let certification = validate(&plan, &catalog, &config).unwrap();
//! assert_eq!(certification.child_packages().len(), 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **Packages (`package`, `version`)**: nevra identities and the RPM version
//!   comparator every phase shares.
//! - **Collaborators (`catalog`, `advisory`)**: the package catalog and the
//!   advisory stream, consumed through traits with in-memory implementations.
//! - **Configuration (`config`)**: time bounds, channel restrictions and the
//!   operator's override directives.
//! - **Phases (`phases`)**: bucketing, overrides and replay.
//! - **Plan (`plan`)**: the frozen bucket sequence and its downstream queries.
//! - **Diagnostics (`suggestions`, `revisions`)**: pasteable corrective
//!   directives, and diffs of advisories edited after they shipped.
//!
//! ## Execution Flow
//!
//! `phases::orchestrator::build` runs:
//!
//! 1.  **Bucketing**: Partition every source into timestamp-keyed buckets.
//! 2.  **Overrides**: Apply merges, reschedules, exclusions, forced inclusions
//!     and time-window trimming.
//!
//! and freezes the result into a `Plan`. `phases::orchestrator::validate`
//! then replays the plan and either certifies it or fails with a report of
//! every finding.

pub mod advisory;
pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod package;
pub mod phases;
pub mod plan;
pub mod revisions;
pub mod suggestions;
pub mod version;

#[cfg(test)]
mod version_proptest;
