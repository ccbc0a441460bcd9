mod common;

use common::run_cli;

#[test]
fn rejects_invalid_json() {
    let (code, stdout, stderr) = run_cli("not json");
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("parsing tool request"));
}

#[test]
fn rejects_unknown_tool() {
    let (code, _, _) = run_cli(r#"{ "tool": "summarize", "text": "x" }"#);
    assert_ne!(code, 0);
}

#[test]
fn rejects_negative_window() {
    let (code, _, _) = run_cli(r#"{ "tool": "slice", "text": "x", "index": 0, "after": -3 }"#);
    assert_ne!(code, 0);
}

#[test]
fn rejects_zero_budget_for_rolling_strategy() {
    let (code, _, stderr) = run_cli(
        r#"{ "tool": "budget", "text": "x", "targetTokens": 0, "strategy": "rollingBudget" }"#,
    );
    assert_eq!(code, 2);
    assert!(stderr.contains("invalid argument"));
}

#[test]
fn unreadable_session_path_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = serde_json::json!({
        "tool": "sanitize",
        "sessions": [ { "sessionId": "d", "path": dir.path() } ]
    });
    let (code, stdout, stderr) = run_cli(&input.to_string());
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("reading"));
}

#[test]
fn invalid_grep_pattern_is_not_fatal() {
    let (code, stdout, _) = run_cli(r#"{ "tool": "grep", "text": "a", "pattern": "(oops" }"#);
    assert_eq!(code, 0);
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(v["matchCount"], 0);
    assert!(!v["error"].as_str().unwrap().is_empty());
}

#[test]
fn bad_config_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("logtrim.toml");
    std::fs::write(&config, "dedup_mode = 3").unwrap();
    let (code, _, stderr) = common::run_cli_with_args(
        &["--config", config.to_str().unwrap()],
        r#"{ "tool": "slice", "text": "a", "index": 0 }"#,
    );
    assert_eq!(code, 2);
    assert!(stderr.contains("parsing"));
}
