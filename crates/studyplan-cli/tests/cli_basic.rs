//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against an isolated HOME so
//! they never touch the real planner data directory.

use std::path::PathBuf;
use std::process::Command;

fn scratch_home(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("studyplan-cli-test-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch home");
    dir
}

fn run_cli(home: &PathBuf, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "studyplan-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .env("STUDYPLAN_ENV", "dev")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

#[test]
fn config_show_prints_defaults() {
    let home = scratch_home("config");
    let (stdout, stderr, code) = run_cli(&home, &["config", "show"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("[scheduler]"));
    assert!(stdout.contains("day_start_hour = 9"));
}

#[test]
fn assignment_add_then_list_round_trips() {
    let home = scratch_home("assignment");
    let (stdout, stderr, code) = run_cli(
        &home,
        &[
            "assignment",
            "add",
            "CLI Test Essay",
            "--category",
            "project",
            "--due",
            "2026-01-15",
            "--minutes",
            "120",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Assignment created:"));

    let (stdout, stderr, code) = run_cli(&home, &["assignment", "list"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("list output should be JSON");
    let titles: Vec<_> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap().to_string())
        .collect();
    assert!(titles.contains(&"CLI Test Essay".to_string()));
}

#[test]
fn schedule_generate_reports_counts() {
    let home = scratch_home("schedule");
    run_cli(
        &home,
        &[
            "assignment",
            "add",
            "Scheduling Fixture",
            "--due",
            "2030-01-15",
            "--minutes",
            "45",
        ],
    );
    let (stdout, stderr, code) = run_cli(&home, &["schedule", "generate"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Scheduled"));

    let (stdout, _, code) = run_cli(&home, &["schedule", "show"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(!parsed.as_array().unwrap().is_empty());
}

#[test]
fn unknown_category_fails_cleanly() {
    let home = scratch_home("bad-category");
    let (_, stderr, code) = run_cli(
        &home,
        &[
            "assignment",
            "add",
            "Broken",
            "--category",
            "nonsense",
            "--due",
            "2026-01-15",
            "--minutes",
            "30",
        ],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown category"));
}
