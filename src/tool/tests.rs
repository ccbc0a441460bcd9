use super::*;
use crate::views::IndexRange;
use serde_json::json;
use std::fs;

fn request(v: serde_json::Value) -> ToolRequest {
    serde_json::from_value(v).unwrap()
}

fn write_log(dir: &std::path::Path, name: &str, lines: &[serde_json::Value]) -> PathBuf {
    let path = dir.join(name);
    let body = lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn parses_each_tool() {
    let cases = [
        json!({ "tool": "sanitize", "logDir": "/tmp/x" }),
        json!({ "tool": "budget", "text": "t", "targetTokens": 10, "strategy": "rollingBudget" }),
        json!({ "tool": "sections", "text": "t", "keys": ["a"], "matchMode": "regex" }),
        json!({ "tool": "grep", "text": "t", "pattern": "a", "flags": "i" }),
        json!({ "tool": "slice", "text": "t", "index": 0 }),
    ];
    for case in cases {
        serde_json::from_value::<ToolRequest>(case.clone())
            .unwrap_or_else(|e| panic!("failed to parse {case}: {e}"));
    }
}

#[test]
fn budget_defaults_to_per_message_cap() {
    match request(json!({ "tool": "budget", "text": "t", "targetTokens": 10 })) {
        ToolRequest::Budget(req) => assert_eq!(req.strategy, Strategy::PerMessageCap),
        other => panic!("expected Budget, got {other:?}"),
    }
}

#[test]
fn grep_defaults() {
    match request(json!({ "tool": "grep", "text": "t", "pattern": "a" })) {
        ToolRequest::Grep(req) => {
            assert_eq!(req.flags, "");
            assert_eq!(req.context, 1);
            assert_eq!(req.max_matches, DEFAULT_MAX_MATCHES);
        }
        other => panic!("expected Grep, got {other:?}"),
    }
}

#[test]
fn negative_windows_are_rejected_at_the_boundary() {
    let bad = json!({ "tool": "slice", "text": "t", "index": 0, "before": -1 });
    assert!(serde_json::from_value::<ToolRequest>(bad).is_err());
}

#[test]
fn unknown_tool_is_rejected() {
    let bad = json!({ "tool": "summarize", "text": "t" });
    assert!(serde_json::from_value::<ToolRequest>(bad).is_err());
}

#[test]
fn sanitize_from_explicit_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        dir.path(),
        "one.jsonl",
        &[
            json!({ "type": "user", "message": { "content": "same" } }),
            json!({ "type": "user", "message": { "content": "same" } }),
        ],
    );
    let req = request(json!({
        "tool": "sanitize",
        "sessions": [ { "sessionId": "one", "path": path } ]
    }));

    match req.execute(&Pipeline::default()).unwrap() {
        ToolOutput::Sanitize(result) => {
            assert_eq!(result.text, "# Session one (current)\n\nUSER: same");
            assert_eq!(result.meta.messages_before, 2);
        }
        other => panic!("expected Sanitize, got {other:?}"),
    }
}

#[test]
fn sanitize_without_a_source_is_invalid() {
    let err = request(json!({ "tool": "sanitize" }))
        .execute(&Pipeline::default())
        .unwrap_err();
    assert!(matches!(err, TrimError::InvalidArgument(_)));
}

#[test]
fn budget_over_a_log_dir_sanitizes_first() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        dir.path(),
        "s.jsonl",
        &[json!({ "type": "user", "message": { "content": "x".repeat(400) } })],
    );
    let req = request(json!({
        "tool": "budget",
        "logDir": dir.path(),
        "targetTokens": 20,
        "strategy": "rollingBudget"
    }));

    match req.execute(&Pipeline::default()).unwrap() {
        ToolOutput::Budget(result) => {
            assert!(result.text.starts_with("# Session s (current)"));
            assert!(result.text.ends_with("(truncated)"));
            assert_eq!(result.meta.truncated_count, 1);
        }
        other => panic!("expected Budget, got {other:?}"),
    }
}

#[test]
fn budget_without_input_is_invalid() {
    let err = request(json!({ "tool": "budget", "targetTokens": 5 }))
        .execute(&Pipeline::default())
        .unwrap_err();
    assert!(matches!(err, TrimError::InvalidArgument(_)));
}

#[test]
fn sections_use_configured_window() {
    let text = "a\nb\nc needle\nd\ne";
    let req = request(json!({ "tool": "sections", "text": text, "keys": ["needle"] }));
    let mut prefs = crate::preferences::Preferences::default();
    prefs.section_window_lines = 1;

    match req.execute(&Pipeline::new(prefs)).unwrap() {
        ToolOutput::Sections(result) => assert_eq!(result.sections["needle"].text, "b\nc needle\nd"),
        other => panic!("expected Sections, got {other:?}"),
    }
}

#[test]
fn output_serializes_in_camel_case() {
    let req = request(json!({ "tool": "grep", "text": "a\n\nb", "pattern": "(" }));
    let out = req.execute(&Pipeline::default()).unwrap();
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["matchCount"], 0);
    assert!(v["error"].as_str().is_some_and(|e| !e.is_empty()));

    let req = request(json!({ "tool": "slice", "text": "a\n\nb", "index": 1, "before": 1 }));
    let v = serde_json::to_value(req.execute(&Pipeline::default()).unwrap()).unwrap();
    assert_eq!(v["sliceText"], "a\n\nb");
    assert_eq!(v["indices"], json!({ "start": 0, "end": 1 }));
    assert_eq!(v["tokensEstimate"], 1);
}

fn user_line(text: &str) -> serde_json::Value {
    json!({ "type": "user", "message": { "content": text } })
}

#[test]
fn sections_over_a_log_dir_sanitizes_first() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "s.jsonl", &[user_line("## Plan\nstep one")]);
    let req = request(json!({ "tool": "sections", "logDir": dir.path(), "keys": ["plan"] }));

    match req.execute(&Pipeline::default()).unwrap() {
        ToolOutput::Sections(result) => {
            assert_eq!(result.sections["plan"].text, "step one");
            assert_eq!(result.detected_headings, vec!["Session s (current)", "Plan"]);
        }
        other => panic!("expected Sections, got {other:?}"),
    }
}

#[test]
fn grep_over_explicit_sessions_sanitizes_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        dir.path(),
        "g.jsonl",
        &[user_line("alpha"), user_line("needle here"), user_line("omega")],
    );
    let req = request(json!({
        "tool": "grep",
        "sessions": [ { "sessionId": "g", "path": path } ],
        "pattern": "needle"
    }));

    match req.execute(&Pipeline::default()).unwrap() {
        ToolOutput::Grep(result) => {
            assert_eq!(result.match_count, 1);
            assert_eq!(result.matches[0].block_range, IndexRange { start: 1, end: 3 });
            assert_eq!(
                result.matches[0].text,
                "USER: alpha\n\nUSER: needle here\n\nUSER: omega"
            );
        }
        other => panic!("expected Grep, got {other:?}"),
    }
}

#[test]
fn slice_over_a_log_dir_sanitizes_first() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "z.jsonl", &[user_line("first"), user_line("second")]);
    let req = request(json!({ "tool": "slice", "logDir": dir.path(), "index": 2, "before": 1 }));

    match req.execute(&Pipeline::default()).unwrap() {
        ToolOutput::Slice(result) => {
            assert_eq!(result.slice_text, "USER: first\n\nUSER: second");
            assert_eq!(result.indices, IndexRange { start: 1, end: 2 });
        }
        other => panic!("expected Slice, got {other:?}"),
    }
}

#[test]
fn views_without_input_are_invalid() {
    let cases = [
        json!({ "tool": "sections", "keys": ["a"] }),
        json!({ "tool": "grep", "pattern": "a" }),
        json!({ "tool": "slice", "index": 0 }),
    ];
    for case in cases {
        let err = request(case.clone())
            .execute(&Pipeline::default())
            .unwrap_err();
        assert!(matches!(err, TrimError::InvalidArgument(_)), "{case}");
    }
}
