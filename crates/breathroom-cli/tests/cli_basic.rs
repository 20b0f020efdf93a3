//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    run_cli_with_input(data_dir, args, "")
}

fn run_cli_with_input(data_dir: &Path, args: &[&str], input: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_breathroom"))
        .args(args)
        .env("BREATHROOM_DATA_DIR", data_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Data dir whose readiness gate opens on the first tick.
fn instant_gate_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "gate.required_stable_ms", "0"]);
    assert_eq!(code, 0, "config set failed: {stderr}");
    dir
}

#[test]
fn test_config_get_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.start_mode"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "auto");

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "display.style"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "decimal-second");
}

#[test]
fn test_config_set_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "timer.start_mode", "manual"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.start_mode"]);
    assert_eq!(stdout.trim(), "manual");
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "display.goal_color", "magenta"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "no.such.key", "1"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["config", "set", "timer.layout", "three"]);
    let (code, stdout, _) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timer"]["layout"], "three");

    let (code, _, _) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.layout"]);
    assert_eq!(stdout.trim(), "two");
}

#[test]
fn test_config_path_and_key_help() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert_eq!(Path::new(stdout.trim()), dir.path().join("config.toml"));

    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("gate.required_stable_ms"));
    assert!(stdout.contains("decimal-second | minute-second"));
}

#[test]
fn test_history_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["history", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No sessions recorded."));

    let (code, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_share_last_without_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["share", "last"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no sessions recorded"));
}

#[test]
fn test_stats_all_empty_json() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["stats", "all", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sessions"], 0);
}

#[test]
fn test_session_records_and_exports() {
    let dir = instant_gate_dir();

    let (code, stdout, stderr) =
        run_cli_with_input(dir.path(), &["session", "--json"], "\n\n\n");
    assert_eq!(code, 0, "session failed: {stderr}");
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["type"].as_str()).collect();
    assert_eq!(kinds.first(), Some(&"session_started"));
    assert!(kinds.contains(&"phase_completed"));
    assert_eq!(kinds.last(), Some(&"session_saved"));

    let (code, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    assert_eq!(code, 0);
    let records: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["phase_count"], 2);
    assert_eq!(records[0]["phase_seconds"].as_array().map(Vec::len), Some(2));
    assert!(records[0]["ended_at"].is_string());

    let (code, stdout, _) = run_cli(dir.path(), &["share", "last"]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("rechaka: "));
    assert!(lines[2].starts_with("puraaka: "));
}

#[test]
fn test_session_quit_before_finishing_saves_nothing() {
    let dir = instant_gate_dir();

    let (code, _, stderr) = run_cli_with_input(dir.path(), &["session", "--json"], "\nq\n");
    assert_eq!(code, 0, "session failed: {stderr}");

    let (_, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    let records: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_three_phase_session_then_delete() {
    let dir = instant_gate_dir();

    let (code, _, stderr) =
        run_cli_with_input(dir.path(), &["session", "--json", "--three"], "\n\n\n\n");
    assert_eq!(code, 0, "session failed: {stderr}");

    let (_, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    let records: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["phase_count"], 3);
    let id = records[0]["id"].as_i64().unwrap().to_string();

    let (code, stdout, _) = run_cli(dir.path(), &["history", "delete", &id]);
    assert_eq!(code, 0);
    assert!(stdout.contains("deleted"));

    let (code, _, _) = run_cli(dir.path(), &["history", "delete", &id]);
    assert_eq!(code, 1);
}

#[test]
fn test_day_views_label_each_layout() {
    let dir = instant_gate_dir();
    let (code, _, _) = run_cli_with_input(dir.path(), &["session", "--json"], "\n\n\n");
    assert_eq!(code, 0);
    let (code, _, _) = run_cli_with_input(dir.path(), &["session", "--json", "--three"], "\n\n\n\n");
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(dir.path(), &["share", "day"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("kumbhaka: "), "{stdout}");
    assert!(!stdout.contains("record3"), "{stdout}");
    assert_eq!(stdout.matches("puraaka: ").count(), 2, "{stdout}");

    let (code, stdout, _) = run_cli(dir.path(), &["stats", "today"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("kumbhaka"), "{stdout}");
    assert!(!stdout.contains("record3"), "{stdout}");
}

#[test]
fn test_session_durations_follow_keypresses_not_ticks() {
    let dir = instant_gate_dir();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "gate.tick_interval_ms", "1000"]);
    assert_eq!(code, 0);

    let mut child = Command::new(env!("CARGO_BIN_EXE_breathroom"))
        .args(["session", "--json"])
        .env("BREATHROOM_DATA_DIR", dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    let mut stdin = child.stdin.take().expect("stdin is piped");
    sleep(Duration::from_millis(300));
    stdin.write_all(b"\n").unwrap();
    stdin.flush().unwrap();
    sleep(Duration::from_millis(700));
    stdin.write_all(b"\n").unwrap();
    stdin.flush().unwrap();
    sleep(Duration::from_millis(450));
    stdin.write_all(b"\n").unwrap();
    drop(stdin);
    let output = child.wait_with_output().expect("Failed to wait for CLI");
    assert!(output.status.success());

    let (_, stdout, _) = run_cli(dir.path(), &["history", "list", "--json"]);
    let records: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.len(), 1);
    let first = records[0]["phase_seconds"][0].as_f64().unwrap();
    let second = records[0]["phase_seconds"][1].as_f64().unwrap();
    // Tick-stamped taps would land on whole seconds here.
    assert!((0.55..0.95).contains(&first), "first phase {first}");
    assert!((0.3..0.7).contains(&second), "second phase {second}");
}
