//! End-to-end runs of the `dealroom` binary against a temporary home.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn dealroom(home: &TempDir, args: &[&str], stdin: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dealroom"));
    cmd.args(args)
        .env("DEALROOM_HOME", home.path())
        .env("RUST_LOG", "error")
        .env_remove("DEALROOM_STATE_STORE")
        .env_remove("DEALROOM_GAME")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().expect("spawn dealroom");
    {
        let mut pipe = child.stdin.take().expect("stdin");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }
    child.wait_with_output().expect("wait dealroom")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed\nstdout:\n{}\nstderr:\n{}",
        what,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn status_json(home: &TempDir) -> serde_json::Value {
    let output = dealroom(home, &["status", "--json"], None);
    assert_success(&output, "status --json");
    serde_json::from_slice(&output.stdout).expect("status output is JSON")
}

#[test]
fn test_init_is_idempotent() {
    let home = TempDir::new().unwrap();

    let first = dealroom(&home, &["init"], None);
    assert_success(&first, "init");
    assert!(String::from_utf8_lossy(&first.stdout).contains("Initialized"));

    let second = dealroom(&home, &["init"], None);
    assert_success(&second, "second init");
    assert!(String::from_utf8_lossy(&second.stdout).contains("already initialized"));

    let status = status_json(&home);
    assert_eq!(status["game"], "valuation");
    assert_eq!(status["terms"].as_array().unwrap().len(), 4);
    assert_eq!(status["fully_approved"], false);
    assert_eq!(status["settlement"]["state"], "pending");
}

#[test]
fn test_two_teams_settle_without_bus() {
    let home = TempDir::new().unwrap();

    // Team 1: four initial values, then exit and confirm.
    let team1 = dealroom(
        &home,
        &["play", "--team", "1", "--no-bus"],
        Some("100\n0.1\n5\n2\nx\ny\n"),
    );
    assert_success(&team1, "team 1");
    assert!(String::from_utf8_lossy(&team1.stdout).contains("Session paused"));

    // Team 2: approve every term.
    let team2 = dealroom(
        &home,
        &["play", "--team", "2", "--no-bus"],
        Some("1\ny\n2\ny\n3\ny\n4\ny\n"),
    );
    assert_success(&team2, "team 2");
    let stdout = String::from_utf8_lossy(&team2.stdout);
    assert!(stdout.contains("$909.09"), "stdout:\n{}", stdout);

    let status = status_json(&home);
    assert_eq!(status["fully_approved"], true);
    assert_eq!(status["display"], "$909.09");
    let value = status["settlement"]["value"].as_f64().unwrap();
    assert!((value - 909.0909).abs() < 1e-3);
}

#[test]
fn test_reset_requires_confirmation() {
    let home = TempDir::new().unwrap();
    assert_success(&dealroom(&home, &["init"], None), "init");

    let refused = dealroom(&home, &["reset"], None);
    assert!(!refused.status.success());

    let reset = dealroom(&home, &["reset", "--yes"], None);
    assert_success(&reset, "reset --yes");
    assert!(String::from_utf8_lossy(&reset.stdout).contains("Cleared 4 terms"));
}

#[test]
fn test_config_json_reflects_flags() {
    let home = TempDir::new().unwrap();
    let output = dealroom(&home, &["config", "--json", "--no-bus"], None);
    assert_success(&output, "config --json");

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(config["bus"].is_null());
    assert_eq!(config["game"], "valuation");
    assert!(config["state_store"]
        .as_str()
        .unwrap()
        .ends_with("negotiation.sqlite"));
}

#[test]
fn test_unknown_game_fails() {
    let home = TempDir::new().unwrap();
    let output = dealroom(&home, &["status", "--game", "bidding"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown game"));
}
