//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory
//! and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_repcue"))
        .args(args)
        .env("HOME", home)
        .env("REPCUE_ENV", "dev")
        .env("REPCUE_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn write_library(dir: &Path) -> String {
    let library = serde_json::json!({
        "beepCodes": {
            "go": { "id": "go", "label": "Go", "pattern": "L" },
            "tick": { "id": "tick", "label": "Tick", "pattern": "S" }
        },
        "projects": {
            "p1": { "id": "p1", "name": "Morning", "exerciseSetIds": ["s1"] }
        },
        "exerciseSets": {
            "s1": {
                "id": "s1",
                "title": "Core",
                "rounds": 3,
                "restBetweenRoundsSec": 20,
                "stepIds": ["a", "b"],
                "beep": { "onStart": "go" }
            }
        },
        "exerciseSteps": {
            "a": { "id": "a", "name": "Plank", "durationSec": 30,
                   "beep": { "countdown": "tick", "countdownFromSec": 3 } },
            "b": { "id": "b", "name": "Crunch", "durationSec": 20 }
        }
    });
    let path = dir.join("library.json");
    std::fs::write(&path, serde_json::to_string_pretty(&library).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_playlist_text() {
    let home = tempfile::tempdir().unwrap();
    let library = write_library(home.path());
    let (code, stdout, _) = run_cli(home.path(), &["playlist", &library, "p1"]);
    assert_eq!(code, 0, "playlist failed");
    assert!(stdout.contains("Morning (8 items)"));
    assert!(stdout.contains("Plank"));
    assert!(stdout.contains("rest"));
}

#[test]
fn test_playlist_json() {
    let home = tempfile::tempdir().unwrap();
    let library = write_library(home.path());
    let (code, stdout, _) = run_cli(home.path(), &["playlist", &library, "p1", "--json"]);
    assert_eq!(code, 0, "playlist --json failed");

    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 8);
    assert_eq!(items[2]["kind"], "rest");
    assert_eq!(items[7]["label"], "Crunch");
}

#[test]
fn test_playlist_unknown_project() {
    let home = tempfile::tempdir().unwrap();
    let library = write_library(home.path());
    let (code, _, stderr) = run_cli(home.path(), &["playlist", &library, "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_pattern_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["pattern", "L P(500) L", "--json"]);
    assert_eq!(code, 0, "pattern failed");

    let compiled: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(compiled["events"].as_array().unwrap().len(), 2);
    assert!((compiled["duration_sec"].as_f64().unwrap() - 1.5).abs() < 1e-9);
}

#[test]
fn test_play_dry_run() {
    let home = tempfile::tempdir().unwrap();
    let library = write_library(home.path());
    let (code, stdout, _) = run_cli(home.path(), &["play", &library, "p1", "--dry-run"]);
    assert_eq!(code, 0, "dry run failed");
    assert!(stdout.contains("[1/8] Plank"));
    assert!(stdout.contains("Rest. Next up: Plank"));
    assert!(stdout.contains("workout complete"));
}

#[test]
fn test_config_set_get_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "set", "audio.volume", "0.4"]);
    assert_eq!(code, 0, "config set failed");
    assert_eq!(stdout.trim(), "ok");

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "audio.volume"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "0.4");

    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let settings: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(settings["speech"]["command"], "espeak");
}

#[test]
fn test_config_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "audio.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_log_empty() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["log", "list"]);
    assert_eq!(code, 0, "log list failed");
    assert!(stdout.contains("no sessions recorded"));

    let (code, stdout, _) = run_cli(home.path(), &["log", "stats"]);
    assert_eq!(code, 0, "log stats failed");
    let stats: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(stats["total_sessions"], 0);
}

#[test]
fn test_completions() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0, "completions failed");
    assert!(stdout.contains("repcue"));
}
