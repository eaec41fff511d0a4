use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn apilog(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apilog"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn apilog")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn generate_then_analyze_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs.json");
    let logs = logs.to_str().unwrap();

    let out = apilog(&["generate", "-n", "1000", "--seed", "11", "-o", logs], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = apilog(&["--log-level", "warn", "analyze", logs], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report = stdout_json(&out);
    assert_eq!(report["summary"]["total_requests"], 1000);
    assert!(report["rate_limit_violations"]["total_violations"].as_u64().unwrap() > 0);
}

#[test]
fn caching_mode_flag_switches_tail() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs.json");
    let records: Vec<Value> = (0..120)
        .map(|i| {
            serde_json::json!({
                "timestamp": format!("2025-01-15T10:{:02}:{:02}Z", i / 60, i % 60),
                "endpoint": "/api/catalog", "method": "GET",
                "response_time_ms": 40, "status_code": 200, "user_id": "user_001",
                "request_size_bytes": 100, "response_size_bytes": 300
            })
        })
        .collect();
    std::fs::write(&logs, serde_json::to_vec(&records).unwrap()).unwrap();

    let out = apilog(
        &["analyze", logs.to_str().unwrap(), "--mode", "caching", "--metrics"],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report = stdout_json(&out);
    assert!(report.get("rate_limit_violations").is_none());
    assert_eq!(report["caching_opportunities"][0]["endpoint"], "/api/catalog");
    assert!(String::from_utf8_lossy(&out.stderr).contains("apilog_records_total"));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("apilog.yaml")).unwrap();
    writeln!(file, "mode: caching\ntop_users: 2").unwrap();

    let out = apilog(&["config"], dir.path());
    assert!(out.status.success());
    let yaml = String::from_utf8_lossy(&out.stdout);
    assert!(yaml.contains("mode: caching"));
    assert!(yaml.contains("top_users: 2"));
}

#[test]
fn empty_batch_prints_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("empty.json");
    std::fs::write(&logs, "[]").unwrap();

    let out = apilog(&["analyze", logs.to_str().unwrap()], dir.path());
    assert!(out.status.success());
    let report = stdout_json(&out);
    assert_eq!(report["summary"]["total_requests"], 0);
    assert_eq!(report["recommendations"][0], "No logs received for analysis.");
}

#[test]
fn non_array_input_exits_with_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("object.json");
    std::fs::write(&logs, r#"{"records": []}"#).unwrap();

    let out = apilog(&["analyze", logs.to_str().unwrap()], dir.path());
    assert_eq!(out.status.code(), Some(3));
    assert!(out.stdout.is_empty());
}

#[test]
fn invalid_tier_table_exits_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("apilog.yaml"), "cost:\n  memory_tiers: []\n").unwrap();
    let logs = dir.path().join("logs.json");
    std::fs::write(&logs, "[]").unwrap();

    let out = apilog(&["analyze", logs.to_str().unwrap()], dir.path());
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn json_log_format_reports_errors_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("object.json");
    std::fs::write(&logs, r#"{"records": []}"#).unwrap();

    let out = apilog(
        &["--log-format", "json", "analyze", logs.to_str().unwrap()],
        dir.path(),
    );
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let last = stderr.lines().last().expect("no stderr output");
    let body: Value = serde_json::from_str(last).unwrap();
    assert_eq!(body["code"], 3);
    assert!(body["error"].as_str().unwrap().contains("expected a JSON array"));
}
