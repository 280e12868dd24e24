//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run, each against its own data
//! directory, and verify outputs.

use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command with `home` as the data directory; stdin is closed.
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "studybell-cli", "--"])
        .args(args)
        .env("STUDYBELL_HOME", home.path())
        .env_remove("GEMINI_API_KEY")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn logged_in() -> TempDir {
    let home = TempDir::new().unwrap();
    let out = run_cli(&home, &["user", "register", "an", "--password", "pw"]);
    assert_eq!(out.0, 0, "register failed: {}", out.2);
    home
}

#[test]
fn test_user_session() {
    let home = logged_in();
    assert_eq!(run_cli(&home, &["user", "whoami"]).1.trim(), "an");

    let out = run_cli(&home, &["user", "logout"]);
    assert_eq!(out.0, 0);
    let out = run_cli(&home, &["user", "whoami"]);
    assert_eq!(out.0, 1);
    assert!(out.2.contains("not logged in"));

    let out = run_cli(&home, &["user", "login", "an", "--password", "nope"]);
    assert_eq!(out.0, 1);
    assert!(out.2.contains("wrong username or password"));

    let out = run_cli(&home, &["user", "login", "an", "--password", "pw"]);
    assert_eq!(out.0, 0, "login failed: {}", out.2);
    assert!(out.1.contains("logged in as an"));
}

#[test]
fn test_register_duplicate_fails() {
    let home = logged_in();
    let out = run_cli(&home, &["user", "register", "an", "--password", "x"]);
    assert_eq!(out.0, 1);
    assert!(out.2.contains("already exists"));
}

#[test]
fn test_schedule_requires_login() {
    let home = TempDir::new().unwrap();
    let out = run_cli(&home, &["schedule", "list"]);
    assert_eq!(out.0, 1);
    assert!(out.2.contains("not logged in"));
}

#[test]
fn test_schedule_add_list_delete() {
    let home = logged_in();
    let out = run_cli(
        &home,
        &["schedule", "add", "Math", "--day", "monday", "--start", "07:00", "--end", "08:30"],
    );
    assert_eq!(out.0, 0, "add failed: {}", out.2);
    let added: serde_json::Value = serde_json::from_str(&out.1).unwrap();
    let id = added["id"].as_str().unwrap().to_string();

    let out = run_cli(&home, &["schedule", "list", "--json"]);
    assert_eq!(out.0, 0);
    let list: serde_json::Value = serde_json::from_str(&out.1).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["day"], "Thứ 2");
    assert_eq!(list[0]["startTime"], "07:00");

    assert_eq!(run_cli(&home, &["schedule", "delete", &id]).0, 0);
    let out = run_cli(&home, &["schedule", "list", "--json"]);
    let list: serde_json::Value = serde_json::from_str(&out.1).unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_schedule_add_rejects_bad_time() {
    let home = logged_in();
    let out = run_cli(
        &home,
        &["schedule", "add", "Math", "--day", "monday", "--start", "7h", "--end", "08:30"],
    );
    assert_eq!(out.0, 1);
}

#[test]
fn test_schedule_bulk_file() {
    let home = logged_in();
    let file = home.path().join("bulk.txt");
    std::fs::write(
        &file,
        "Toán - Thứ 2 - 07:00 - 08:30\nnot a line\nLý - Thứ 4 - 09:00 - 10:30\n",
    )
    .unwrap();

    let out = run_cli(&home, &["schedule", "bulk", "--file", file.to_str().unwrap()]);
    assert_eq!(out.0, 0, "bulk failed: {}", out.2);
    assert!(out.2.contains("not a line"));

    let out = run_cli(&home, &["schedule", "list", "--json"]);
    let list: serde_json::Value = serde_json::from_str(&out.1).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_exam_add_list() {
    let home = logged_in();
    let out = run_cli(
        &home,
        &["exam", "add", "Giải tích", "--date", "2099-01-15", "--tag", "Cuối kỳ"],
    );
    assert_eq!(out.0, 0, "exam add failed: {}", out.2);

    let out = run_cli(&home, &["exam", "list", "--json"]);
    assert_eq!(out.0, 0);
    let list: serde_json::Value = serde_json::from_str(&out.1).unwrap();
    assert_eq!(list[0]["subject"], "Giải tích");
    assert_eq!(list[0]["urgent"], false);
    assert!(list[0]["days_left"].as_i64().unwrap() > 0);
}

#[test]
fn test_export_ics() {
    let home = logged_in();
    run_cli(
        &home,
        &["schedule", "add", "Math", "--day", "monday", "--start", "07:00", "--end", "08:30"],
    );
    let path = home.path().join("out.ics");
    let out = run_cli(&home, &["export", "ics", "--out", path.to_str().unwrap()]);
    assert_eq!(out.0, 0, "export failed: {}", out.2);

    let ics = std::fs::read_to_string(&path).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("SUMMARY:Math"));
    assert!(ics.contains("RRULE:FREQ=WEEKLY"));
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let out = run_cli(&home, &["config", "get", "reminders.tick_interval_ms"]);
    assert_eq!(out.1.trim(), "1000");

    assert_eq!(run_cli(&home, &["config", "set", "alarm.volume", "40"]).0, 0);
    assert_eq!(run_cli(&home, &["config", "get", "alarm.volume"]).1.trim(), "40");

    let out = run_cli(&home, &["config", "set", "alarm.volume", "400"]);
    assert_eq!(out.0, 1);
    assert_eq!(run_cli(&home, &["config", "get", "alarm.volume"]).1.trim(), "40");

    let out = run_cli(&home, &["config", "get", "no.such.key"]);
    assert_eq!(out.0, 1);

    let out = run_cli(&home, &["config", "list"]);
    assert!(out.1.contains("alarm.style = standard"));
}

#[test]
fn test_alarm_set_list_play() {
    let home = TempDir::new().unwrap();
    assert_eq!(run_cli(&home, &["alarm", "set", "gentle"]).0, 0);
    let out = run_cli(&home, &["alarm", "list"]);
    assert!(out.1.contains("* gentle"));

    let out = run_cli(&home, &["alarm", "play", "digital"]);
    assert_eq!(out.0, 0, "play failed: {}", out.2);
    assert!(home.path().join("alarm.wav").exists());
}

#[test]
fn test_watch_exits_on_eof() {
    let home = logged_in();
    let out = run_cli(&home, &["watch", "--interval-ms", "50"]);
    assert_eq!(out.0, 0, "watch failed: {}", out.2);
    assert!(out.1.contains("watching schedule for an"));
}

#[test]
fn test_watch_rejects_out_of_range_interval() {
    let home = logged_in();
    let out = run_cli(&home, &["watch", "--interval-ms", "0"]);
    assert_eq!(out.0, 2);
    assert!(out.2.contains("--interval-ms"));
}
