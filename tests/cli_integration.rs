//! CLI Integration Tests
//!
//! These tests verify that the CLI commands work correctly end-to-end.
//! They test the actual binary behavior, not just the library.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Run immulog against the database `testdb` under `root` and return
/// (stdout, stderr, success)
fn run_immulog(args: &[&str], root: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_immulog"))
        .arg("--root")
        .arg(root)
        .args(["--name", "testdb", "-f", "json"])
        .args(args)
        .output()
        .expect("Failed to execute immulog");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn run_json(args: &[&str], root: &Path) -> serde_json::Value {
    let (stdout, stderr, success) = run_immulog(args, root);
    assert!(success, "{:?} failed: {}", args, stderr);
    serde_json::from_str(stdout.trim()).expect("stdout should be JSON")
}

// ============================================================================
// Database Initialization Tests
// ============================================================================

#[test]
fn test_cli_init_creates_database() {
    let dir = tempdir().unwrap();

    let json = run_json(&["init"], dir.path());
    assert_eq!(json["status"], "ok");
    assert!(dir.path().join("testdb").join("tx.log").exists());

    let (_stdout, _stderr, success) = run_immulog(&["init"], dir.path());
    assert!(!success, "second init should fail");
}

#[test]
fn test_cli_commands_require_database() {
    let dir = tempdir().unwrap();
    let (_stdout, stderr, success) = run_immulog(&["get", "a"], dir.path());
    assert!(!success);
    assert!(stderr.contains("not found"), "got: {}", stderr);
}

// ============================================================================
// Read / Write Tests
// ============================================================================

#[test]
fn test_cli_set_and_get() {
    let dir = tempdir().unwrap();
    run_json(&["init"], dir.path());

    let tx = run_json(&["set", "A=1", "B=1"], dir.path());
    assert_eq!(tx["id"], 1);
    assert_eq!(tx["entries"], 2);
    run_json(&["set", "A=2"], dir.path());

    let latest = run_json(&["get", "A"], dir.path());
    assert_eq!(latest["value"], "2");
    assert_eq!(latest["tx"], 2);

    let bounded = run_json(&["get", "A", "--at", "1"], dir.path());
    assert_eq!(bounded["value"], "1");
}

#[test]
fn test_cli_rejects_malformed_entries() {
    let dir = tempdir().unwrap();
    run_json(&["init"], dir.path());

    let (_stdout, _stderr, success) = run_immulog(&["set", "novalue"], dir.path());
    assert!(!success);
    let (_stdout, stderr, success) = run_immulog(&["set", "k=1", "k=2"], dir.path());
    assert!(!success);
    assert!(stderr.contains("Duplicate key"), "got: {}", stderr);
}

#[test]
fn test_cli_history_and_tx() {
    let dir = tempdir().unwrap();
    run_json(&["init"], dir.path());
    for v in ["1", "2", "3"] {
        run_json(&["set", &format!("K={}", v)], dir.path());
    }

    let history = run_json(&["history", "K"], dir.path());
    assert_eq!(history["count"], 3);
    assert_eq!(history["revisions"][0]["value"], "1");

    let newest = run_json(&["history", "K", "--desc", "--limit", "1"], dir.path());
    assert_eq!(newest["count"], 1);
    assert_eq!(newest["revisions"][0]["tx"], 3);

    let tx = run_json(&["tx", "2"], dir.path());
    assert_eq!(tx["id"], 2);
    assert_eq!(tx["entries"][0]["value"], "2");
}

// ============================================================================
// Verification Tests
// ============================================================================

#[test]
fn test_cli_verified_reads_advance_state() {
    let dir = tempdir().unwrap();
    run_json(&["init"], dir.path());

    let first = run_json(&["verified-set", "A=1"], dir.path());
    assert_eq!(first["verified"], true);
    assert_eq!(first["state"]["tx_id"], 1);

    run_json(&["set", "B=2"], dir.path());
    run_json(&["set", "A=3"], dir.path());

    let read = run_json(&["verified-get", "A"], dir.path());
    assert_eq!(read["entry"]["value"], "3");
    assert_eq!(read["state"]["tx_id"], 3);

    let state = run_json(&["state"], dir.path());
    assert_eq!(state["alh"], read["state"]["alh"]);
    assert!(dir.path().join("testdb.state.json").exists());
}

#[test]
fn test_cli_verify_and_health() {
    let dir = tempdir().unwrap();
    run_json(&["init"], dir.path());
    run_json(&["set", "x=1"], dir.path());

    let verify = run_json(&["verify"], dir.path());
    assert_eq!(verify["status"], "ok");
    assert_eq!(verify["state"]["tx_id"], 1);

    let health = run_json(&["health"], dir.path());
    assert_eq!(health["status"], true);
    assert_eq!(health["tx_id"], 1);
}
