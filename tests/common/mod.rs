//! Shared test utilities for integration and E2E tests.
//!
//! This module provides snapshot and configuration fixtures, a temporary
//! directory fixture, and helpers that build catalogs and advisory streams
//! through the public library API.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);
//!     fixture.command().arg("plan").assert().success();
//! }
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use chrono::DateTime;

use errata_scheduler::advisory::{Advisory, AdvisoryPackage, MemoryAdvisorySource};
use errata_scheduler::catalog::{BinaryRecord, MemoryCatalog, SourceRecord};
use errata_scheduler::package::Nevra;
use errata_scheduler::phases::orchestrator::BuildOptions;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{configs, snapshots};
    pub use super::TestFixture;
}

/// 2011-01-01T00:00:00Z
pub const JAN_1: i64 = 1_293_840_000;
/// 2011-01-02T00:00:00Z
pub const JAN_2: i64 = 1_293_926_400;
/// 2011-01-03T00:00:00Z
pub const JAN_3: i64 = 1_294_012_800;

/// Snapshot documents accepted by `--snapshot`.
pub mod snapshots {
    /// A golden `base` source and one advisory updating `foo`.
    pub const SIMPLE: &str = r#"
sources:
  - nevra: base-1-1.src
    buildTime: 1293800000
    binaries:
      - nevra: base-1-1.x86_64
  - nevra: foo-1.2-1.src
    buildTime: 1293839990
    binaries:
      - nevra: foo-1.2-1.x86_64
advisories:
  - name: ADV-1
    issueDate: "2011-01-01T00:00:00Z"
    synopsis: foo update
    packages:
      - nevra: foo-1.2-1.x86_64
        channel: base
"#;

    /// `foo` is shipped at 1.2 and then at 1.1.
    pub const BACKWARDS: &str = r#"
sources:
  - nevra: foo-1.2-1.src
    buildTime: 1293839990
    binaries:
      - nevra: foo-1.2-1.x86_64
  - nevra: foo-1.1-1.src
    buildTime: 1293926390
    binaries:
      - nevra: foo-1.1-1.x86_64
advisories:
  - name: ADV-1
    issueDate: "2011-01-01T00:00:00Z"
    synopsis: foo update
    packages:
      - nevra: foo-1.2-1.x86_64
        channel: base
  - name: ADV-2
    issueDate: "2011-01-02T00:00:00Z"
    synopsis: foo rollback
    packages:
      - nevra: foo-1.1-1.x86_64
        channel: base
"#;

    /// One source ships `a-bin`, which obsoletes its sibling `b-bin`.
    pub const OBSOLETES: &str = r#"
sources:
  - nevra: ab-1-1.src
    buildTime: 1293839990
    binaries:
      - nevra: a-bin-1-1.x86_64
        obsoletes: [b-bin]
      - nevra: b-bin-1-1.x86_64
advisories:
  - name: ADV-5
    issueDate: "2011-01-01T00:00:00Z"
    synopsis: ab update
    packages:
      - nevra: a-bin-1-1.x86_64
        channel: base
"#;

    /// `late` is built after the first advisory and no advisory covers it.
    pub const ORPHAN: &str = r#"
sources:
  - nevra: foo-1.2-1.src
    buildTime: 1293839990
    binaries:
      - nevra: foo-1.2-1.x86_64
  - nevra: late-1-1.src
    buildTime: 1293900000
    binaries:
      - nevra: late-1-1.x86_64
advisories:
  - name: ADV-1
    issueDate: "2011-01-01T00:00:00Z"
    packages:
      - nevra: foo-1.2-1.x86_64
        channel: base
"#;

    /// An advisory naming a binary the catalog has never seen.
    pub const UNKNOWN_BINARY: &str = r#"
sources:
  - nevra: foo-1.2-1.src
    buildTime: 1293839990
    binaries:
      - nevra: foo-1.2-1.x86_64
advisories:
  - name: ADV-1
    issueDate: "2011-01-01T00:00:00Z"
    packages:
      - nevra: foo-1.2-1.x86_64
        channel: base
  - name: ADV-9
    issueDate: "2011-01-02T00:00:00Z"
    packages:
      - nevra: ghost-1-1.x86_64
        channel: base
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "sources: [unclosed";
}

/// Configuration documents accepted by `--config`.
pub mod configs {
    pub const KEEP_OBSOLETE: &str = "keepObsolete: [[a-bin, b-bin]]\n";

    pub const ALLOW_ORPHAN: &str = "allowMissingErrata: [late-1-1.src]\n";

    pub const ALLOW_DOWNGRADE: &str = r#"
allowDowngrades:
  - bucket: 1293926400
    from: foo-1.2-1.src
    to: foo-1.1-1.src
"#;

    pub const BROKEN_ADV_9: &str = "brokenErrata: [ADV-9]\n";

    /// Misspelled `keepObsolete`.
    pub const TYPO: &str = "keepObsolet: [[a-bin, b-bin]]\n";
}

/// A temporary directory holding a snapshot and an optional config.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `snapshot.yaml`.
    pub fn with_snapshot(self, content: &str) -> Self {
        self.temp_dir
            .child("snapshot.yaml")
            .write_str(content)
            .expect("Failed to write snapshot file");
        self
    }

    /// Write `scheduler.yaml`.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("scheduler.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.temp_dir.path().join("snapshot.yaml")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("scheduler.yaml")
    }

    /// A command for `subcommand` reading this fixture's snapshot, with
    /// colors off and the config variable cleared.
    pub fn command(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("errata-scheduler");
        cmd.current_dir(self.path())
            .env_remove("ERRATA_SCHEDULER_CONFIG")
            .env_remove("ERRATA_SCHEDULER_LOG")
            .arg("--color")
            .arg("never")
            .arg(subcommand)
            .arg("--snapshot")
            .arg(self.snapshot_path());
        cmd
    }

    /// Like [`TestFixture::command`], also passing `--config`.
    pub fn command_with_config(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = self.command(subcommand);
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn nevra(value: &str) -> Nevra {
    value.parse().expect("valid nevra")
}

/// Source record whose binaries share its version and build time.
pub fn source(nevra_str: &str, build_time: i64, binaries: &[&str]) -> SourceRecord {
    let src = nevra(nevra_str);
    SourceRecord {
        binaries: binaries
            .iter()
            .map(|name| BinaryRecord {
                nevra: Nevra {
                    name: name.to_string(),
                    ..src.with_arch("x86_64")
                },
                location: None,
                obsoletes: Default::default(),
                build_time: None,
            })
            .collect(),
        nevra: src,
        build_time,
    }
}

/// Advisory in the `base` channel.
pub fn advisory(name: &str, issued: i64, binaries: &[&str]) -> Advisory {
    Advisory {
        name: name.to_string(),
        issue_date: DateTime::from_timestamp(issued, 0).expect("valid timestamp"),
        last_modified: None,
        synopsis: format!("{name} update"),
        description: String::new(),
        packages: binaries
            .iter()
            .map(|binary| AdvisoryPackage {
                nevra: nevra(binary),
                channel: "base".to_string(),
            })
            .collect(),
    }
}

pub fn catalog(records: Vec<SourceRecord>) -> MemoryCatalog {
    MemoryCatalog::from_records(records).expect("consistent catalog")
}

pub fn advisories(list: Vec<Advisory>) -> MemoryAdvisorySource {
    MemoryAdvisorySource::new(list)
}

/// Build options pinned far after every fixture date.
pub fn options() -> BuildOptions {
    BuildOptions {
        now: DateTime::from_timestamp(2_000_000_000, 0).expect("valid timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_snapshot() {
        let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);
        assert!(fixture.snapshot_path().exists());
    }

    #[test]
    fn test_configs_are_valid() {
        for config in [
            configs::KEEP_OBSOLETE,
            configs::ALLOW_ORPHAN,
            configs::ALLOW_DOWNGRADE,
            configs::BROKEN_ADV_9,
        ] {
            errata_scheduler::config::parse(config).expect("config should parse");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(snapshots::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
