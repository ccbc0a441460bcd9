use crate::transcript::{ConversationEntry, Entry, MessageContent};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Markdown heading of any level (1–6 `#` followed by whitespace).
static ANY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s").expect("static regex"));

// ===================================================================
// Block: the atomic unit of deduplication
// ===================================================================

/// Who produced a block. `Session` marks the synthetic header that
/// separates one session's blocks from the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    User,
    Assistant,
    ToolUse,
    Session,
}

impl Actor {
    pub fn tag(self) -> &'static str {
        match self {
            Actor::User => "USER",
            Actor::Assistant => "ASSISTANT",
            Actor::ToolUse => "TOOL_USE",
            Actor::Session => "SESSION",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: Actor,
    pub text: String,
}

impl Block {
    pub fn new(label: Actor, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }

    pub fn is_session_header(&self) -> bool {
        self.label == Actor::Session
    }
}

/// True for a line holding only an actor tag, as written above a block that
/// opens with a heading or fence.
pub fn is_tag_line(line: &str) -> bool {
    line.trim_end().strip_suffix(':').is_some_and(|tag| {
        [Actor::User, Actor::Assistant, Actor::ToolUse]
            .iter()
            .any(|a| a.tag() == tag)
    })
}

/// True for a line that opens or closes a fenced code region.
pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

// ===================================================================
// Extraction
// ===================================================================

/// Map one log entry to zero or more blocks.
pub fn extract_blocks(entry: &Entry) -> Vec<Block> {
    let regions = match entry {
        Entry::User(conv) => user_regions(conv),
        Entry::Assistant(conv) => assistant_regions(conv),
        Entry::Other => Vec::new(),
    };
    regions
        .into_iter()
        .flat_map(|(label, text)| split_region(label, &text))
        .collect()
}

/// Extract every entry of a session, preserving order.
pub fn extract_all<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<Block> {
    entries.into_iter().flat_map(extract_blocks).collect()
}

fn user_regions(conv: &ConversationEntry) -> Vec<(Actor, String)> {
    if conv.is_tool_result() {
        return Vec::new();
    }
    let text = match &conv.message.content {
        MessageContent::Text(t) => t.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                serde_json::Value::String(s) => Some(s.as_str()),
                other => other.get("text").and_then(|t| t.as_str()),
            })
            .collect::<Vec<_>>()
            .join(" "),
        MessageContent::Other(v) => v.to_string(),
    };
    vec![(Actor::User, text)]
}

fn assistant_regions(conv: &ConversationEntry) -> Vec<(Actor, String)> {
    match &conv.message.content {
        MessageContent::Text(t) => vec![(Actor::Assistant, t.clone())],
        MessageContent::Parts(parts) => parts.iter().filter_map(assistant_part).collect(),
        MessageContent::Other(v) => vec![(Actor::Assistant, v.to_string())],
    }
}

fn assistant_part(part: &serde_json::Value) -> Option<(Actor, String)> {
    if let serde_json::Value::String(s) = part {
        return Some((Actor::Assistant, s.clone()));
    }
    // Tool results are left out on purpose; only the call itself is kept.
    if part.get("type").and_then(|t| t.as_str()) == Some("tool_use") {
        let name = part.get("name").and_then(|n| n.as_str()).unwrap_or("unknown");
        let input = part
            .get("input")
            .map(|i| i.to_string())
            .unwrap_or_else(|| "{}".into());
        return Some((Actor::ToolUse, format!("{name} {input}")));
    }
    part.get("text")
        .and_then(|t| t.as_str())
        .map(|t| (Actor::Assistant, t.to_string()))
}

/// Split a labeled region into blocks at heading and fence boundaries.
///
/// A heading line or an opening fence starts a new block. A fenced region
/// stays in one block through its closing fence, and the line after the
/// closing fence starts another block. Blocks that are blank after trimming
/// are dropped. The first block carries the actor tag (`USER: ...`), on its
/// own line when the block opens with a heading or fence.
pub fn split_region(label: Actor, text: &str) -> Vec<Block> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let mut flush = |current: &mut Vec<&str>| {
        let joined = current.join("\n");
        current.clear();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }
    };

    for line in text.lines() {
        if in_fence {
            current.push(line);
            if is_fence(line) {
                in_fence = false;
                flush(&mut current);
            }
            continue;
        }
        if is_fence(line) {
            flush(&mut current);
            current.push(line);
            in_fence = true;
        } else if ANY_HEADING.is_match(line) {
            flush(&mut current);
            current.push(line);
        } else {
            current.push(line);
        }
    }
    flush(&mut current);

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            if i > 0 {
                Block::new(label, piece)
            } else if is_fence(&piece) || ANY_HEADING.is_match(&piece) {
                Block::new(label, format!("{}:\n{piece}", label.tag()))
            } else {
                Block::new(label, format!("{}: {piece}", label.tag()))
            }
        })
        .collect()
}
