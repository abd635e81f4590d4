//! End-to-end tests for CLI exit codes.
//!
//! - Exit code 0: Success, or a certified plan
//! - Exit code 1: Any error, including a failed consistency check
//! - Exit code 2: Invalid command-line usage (handled by clap)

mod common;

use common::prelude::*;

/// Exit code 0 is returned for a certified plan.
#[test]
fn test_exit_code_success() {
    let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);

    fixture.command("check").assert().code(0);
}

/// Exit code 0 is returned for --help.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("errata-scheduler");

    cmd.arg("--help").assert().code(0);
}

/// Exit code 1 is returned when the replay reports findings.
#[test]
fn test_exit_code_consistency_failure() {
    let fixture = TestFixture::new().with_snapshot(snapshots::OBSOLETES);

    fixture.command("check").assert().code(1);
}

/// Exit code 1 is returned when bucketing fails.
#[test]
fn test_exit_code_bucketing_failure() {
    let fixture = TestFixture::new().with_snapshot(snapshots::UNKNOWN_BINARY);

    fixture.command("plan").assert().code(1);
}

/// Exit code 2 is returned for an unknown subcommand.
#[test]
fn test_exit_code_invalid_subcommand() {
    let mut cmd = cargo_bin_cmd!("errata-scheduler");

    cmd.arg("promote")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
