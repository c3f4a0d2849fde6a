//! Integration tests for the modsolve CLI binary.
//!
//! These tests exercise the actual compiled binary using assert_cmd.

use assert_cmd::Command;
use mods_test_utils::{ManifestBuilder, TestModsDir};
use predicates::prelude::*;

/// Get a Command for the modsolve binary with colors disabled
fn modsolve_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("modsolve"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn consistent_dir() -> TestModsDir {
    let dir = TestModsDir::new();
    dir.add_mod(ManifestBuilder::new("alpha", "1.0").depends("beta", ">=1.0.0 <2.0.0"));
    dir.add_mod(ManifestBuilder::new("beta", "1.0.0").load_type("if_required"));
    dir.add_mod(ManifestBuilder::new("beta", "2.0.0").load_type("if_required"));
    dir
}

fn conflicting_dir() -> TestModsDir {
    let dir = TestModsDir::new();
    dir.add_mod(
        ManifestBuilder::new("alpha", "1.0")
            .breaks("beta", "=1.0.0")
            .reason("beta 1.0.0 corrupts alpha saves"),
    );
    dir.add_mod(ManifestBuilder::new("beta", "1.0.0"));
    dir
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_output() {
    modsolve_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("predicate"));
}

#[test]
fn test_missing_subcommand_fails() {
    modsolve_cmd().assert().failure();
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_prints_chosen_mods() {
    let dir = consistent_dir();
    modsolve_cmd()
        .arg("resolve")
        .arg(dir.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha 1.0"))
        .stdout(predicate::str::contains("beta 1.0.0"))
        .stdout(predicate::str::contains("beta 2.0.0").not());
}

#[test]
fn test_resolve_json() {
    let dir = consistent_dir();
    let output = modsolve_cmd()
        .args(["resolve", "--json"])
        .arg(dir.root())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let mods: Vec<(&str, &str)> = report["mods"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["id"].as_str().unwrap(), m["version"].as_str().unwrap()))
        .collect();
    assert_eq!(mods, vec![("alpha", "1.0"), ("beta", "1.0.0")]);
}

#[test]
fn test_resolve_conflict_exits_one() {
    let dir = conflicting_dir();
    modsolve_cmd()
        .arg("resolve")
        .arg(dir.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Blamed:  alpha"))
        .stderr(predicate::str::contains("beta 1.0.0 corrupts alpha saves"))
        .stderr(predicate::str::contains("no consistent set of mods exists"));
}

#[test]
fn test_resolve_conflict_json() {
    let dir = conflicting_dir();
    let output = modsolve_cmd()
        .args(["resolve", "--json"])
        .arg(dir.root())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let failure: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(failure["error"], "unsatisfiable");
    assert_eq!(failure["blamed"], "alpha");
    assert!(
        failure["chain"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["kind"] == "breaks")
    );
}

#[test]
fn test_resolve_reads_config_from_dir() {
    let dir = conflicting_dir();
    dir.write_config("[scan]\ndisabled = [\"beta\"]\n");
    modsolve_cmd()
        .arg("resolve")
        .arg(dir.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha 1.0"))
        .stdout(predicate::str::contains("beta").not());
}

#[test]
fn test_resolve_missing_config_file() {
    let dir = consistent_dir();
    modsolve_cmd()
        .arg("resolve")
        .arg(dir.root())
        .args(["--config", "does-not-exist.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_resolve_invalid_manifest() {
    let dir = TestModsDir::new();
    dir.write_manifest("broken", "[mod]\nid = \"broken\"\n");
    modsolve_cmd()
        .arg("resolve")
        .arg(dir.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse manifest"));
}

// ============================================================================
// scan
// ============================================================================

#[test]
fn test_scan_lists_candidates() {
    let dir = consistent_dir();
    modsolve_cmd()
        .arg("scan")
        .arg(dir.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("beta 2.0.0 [if_required]"))
        .stdout(predicate::str::contains("3 candidates"));
}

#[test]
fn test_scan_empty_directory() {
    let dir = TestModsDir::new();
    modsolve_cmd()
        .arg("scan")
        .arg(dir.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("None"));
}

// ============================================================================
// predicate
// ============================================================================

#[test]
fn test_predicate_reports_matches() {
    modsolve_cmd()
        .args(["predicate", "1.4.x", "1.4.7", "1.5.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.4.7 matches"))
        .stdout(predicate::str::contains("1.5.0 does not match"));
}

#[test]
fn test_predicate_invalid() {
    modsolve_cmd()
        .args(["predicate", ">=", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
