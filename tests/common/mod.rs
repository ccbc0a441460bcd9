#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub fn run_cli(stdin_json: &str) -> (i32, String, String) {
    run_cli_with_args(&[], stdin_json)
}

pub fn run_cli_with_args(args: &[&str], stdin_json: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_logtrim"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(stdin_json.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

pub fn user(text: &str) -> serde_json::Value {
    serde_json::json!({ "type": "user", "message": { "role": "user", "content": text } })
}

pub fn asst(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "assistant",
        "message": { "role": "assistant", "content": [ { "type": "text", "text": text } ] }
    })
}

pub fn tool_use(name: &str, input: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "assistant",
        "message": { "role": "assistant", "content": [
            { "type": "tool_use", "id": "toolu_1", "name": name, "input": input }
        ] }
    })
}

/// Write one JSONL session log and return its path.
pub fn write_session(dir: &Path, id: &str, lines: &[serde_json::Value]) -> PathBuf {
    let path = dir.join(format!("{id}.jsonl"));
    let body = lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(&path, body).unwrap();
    path
}

pub fn parse_stdout(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad stdout {stdout:?}: {e}"))
}
