use crate::error::{Result, TrimError};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ===================================================================
// Top-level log entry, one per JSONL line
// ===================================================================

/// A single line of a session log.
///
/// Discriminated by the `type` field. Only `user` and `assistant` entries
/// carry content we care about; every other type collapses into `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Entry {
    #[serde(rename = "user")]
    User(ConversationEntry),
    #[serde(rename = "assistant")]
    Assistant(ConversationEntry),
    #[serde(other)]
    Other,
}

/// User and assistant entries share the same shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub message: Message,
    /// Present on user entries that carry a tool response rather than a
    /// prompt. The payload itself is never rendered.
    #[serde(default)]
    pub tool_use_result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: MessageContent,
}

/// `message.content` is either a plain string or an array of typed parts.
/// Anything else is kept raw and stringified on extraction.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
    Other(serde_json::Value),
}

impl ConversationEntry {
    /// True when this entry only relays tool output back to the model.
    pub fn is_tool_result(&self) -> bool {
        if self.tool_use_result.is_some() {
            return true;
        }
        match &self.message.content {
            MessageContent::Parts(parts) => {
                !parts.is_empty()
                    && parts
                        .iter()
                        .all(|p| p.get("type").and_then(|t| t.as_str()) == Some("tool_result"))
            }
            _ => false,
        }
    }
}

// ===================================================================
// Log reader
// ===================================================================

/// Lazy iterator over the entries of one session file.
///
/// Blank lines are skipped. Lines that fail to parse (or are not valid
/// UTF-8) are logged at debug level and skipped. Read failures after the
/// file was opened are yielded as errors.
pub struct Entries {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
}

impl Iterator for Entries {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines.as_mut()?;
        loop {
            let line = match lines.next()? {
                Ok(line) => line,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    self.line_no += 1;
                    debug!(path = %self.path.display(), line = self.line_no, "skipping non-UTF-8 log line");
                    continue;
                }
                Err(e) => {
                    self.lines = None;
                    return Some(Err(TrimError::io(&self.path, e)));
                }
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Entry>(line) {
                Ok(entry) => return Some(Ok(entry)),
                Err(e) => {
                    debug!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %e,
                        "skipping malformed log line"
                    );
                }
            }
        }
    }
}

/// Open a session file for streaming. A missing file yields an empty
/// sequence; any other open failure is an error. Each call starts over from
/// the top of the file.
pub fn read_entries(path: &Path) -> Result<Entries> {
    let lines = match File::open(path) {
        Ok(file) => Some(BufReader::new(file).lines()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "session file not found, treating as empty");
            None
        }
        Err(e) => return Err(TrimError::io(path, e)),
    };
    Ok(Entries {
        path: path.to_path_buf(),
        lines,
        line_no: 0,
    })
}

/// Read a whole session file into memory.
pub fn read_session(path: &Path) -> Result<Vec<Entry>> {
    read_entries(path)?.collect()
}
