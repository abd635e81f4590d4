//! End-to-end tests for the `plan` command
//!
//! These tests invoke the actual CLI binary and validate its behavior
//! from a user's perspective.

mod common;

use common::prelude::*;

/// Test that --help flag shows help information
#[test]
fn test_plan_help() {
    let mut cmd = cargo_bin_cmd!("errata-scheduler");

    cmd.arg("plan")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_plan_requires_snapshot() {
    let mut cmd = cargo_bin_cmd!("errata-scheduler");

    cmd.arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--snapshot"));
}

#[test]
fn test_plan_prints_buckets() {
    let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);

    fixture
        .command("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("* Initial import\n    - base-1-1.src\n"))
        .stdout(predicate::str::contains(
            "* Update 1293840000 (2011-01-01 00:00:00 UTC)\n    ADV-1: foo update\n    - foo-1.2-1.src\n",
        ));
}

#[test]
fn test_plan_json_output() {
    let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);

    let output = fixture.command("plan").arg("--json").output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("plan output should be JSON");
    let text = value.to_string();
    assert!(text.contains("foo-1.2-1.src"), "{text}");
    assert!(text.contains("ADV-1"), "{text}");
}

#[test]
fn test_plan_after_skips_earlier_buckets() {
    let fixture = TestFixture::new().with_snapshot(snapshots::SIMPLE);

    fixture
        .command("plan")
        .arg("--after")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo-1.2-1.src"))
        .stdout(predicate::str::contains("Initial import").not());
}

#[test]
fn test_plan_now_hides_future_buckets() {
    let fixture = TestFixture::new().with_snapshot(snapshots::BACKWARDS);

    fixture
        .command("plan")
        .arg("--now")
        .arg("1293840000")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo-1.2-1.src"))
        .stdout(predicate::str::contains("foo-1.1-1.src").not());
}

#[test]
fn test_plan_missing_snapshot_file() {
    let fixture = TestFixture::new();

    fixture
        .command("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_plan_invalid_snapshot() {
    let fixture = TestFixture::new().with_snapshot(snapshots::INVALID_YAML);

    fixture
        .command("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse snapshot"));
}

#[test]
fn test_plan_missing_errata() {
    let fixture = TestFixture::new().with_snapshot(snapshots::ORPHAN);

    fixture
        .command("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing errata for packages: late-1-1.src",
        ));
}

#[test]
fn test_plan_allowed_missing_errata() {
    let fixture = TestFixture::new()
        .with_snapshot(snapshots::ORPHAN)
        .with_config(configs::ALLOW_ORPHAN);

    fixture
        .command_with_config("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("late-1-1.src"));
}

#[test]
fn test_plan_unknown_binary_fails() {
    let fixture = TestFixture::new().with_snapshot(snapshots::UNKNOWN_BINARY);

    fixture
        .command("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Advisories reference unknown packages"))
        .stderr(predicate::str::contains("ADV-9"));
}

#[test]
fn test_plan_broken_errata_tolerated() {
    let fixture = TestFixture::new()
        .with_snapshot(snapshots::UNKNOWN_BINARY)
        .with_config(configs::BROKEN_ADV_9);

    fixture
        .command_with_config("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghost").not());
}

#[test]
fn test_plan_config_typo_suggests_directive() {
    let fixture = TestFixture::new()
        .with_snapshot(snapshots::SIMPLE)
        .with_config(configs::TYPO);

    fixture
        .command_with_config("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"))
        .stderr(predicate::str::contains("Did you mean 'keepObsolete'?"));
}

#[test]
fn test_plan_config_from_environment() {
    let fixture = TestFixture::new()
        .with_snapshot(snapshots::ORPHAN)
        .with_config(configs::ALLOW_ORPHAN);

    fixture
        .command("plan")
        .env("ERRATA_SCHEDULER_CONFIG", fixture.config_path())
        .assert()
        .success();
}
