use crate::blocks::{Block, is_tag_line};
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_PREVIEW_CHARS: usize = 120;
pub const DEFAULT_TOP_REPEATED: usize = 10;

/// What happens to a block whose fingerprint was already seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Drop the repeat outright.
    #[default]
    Basic,
    /// Replace the repeat with a short marker block.
    Aggressive,
}

/// One frequently repeated block, for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatedBlock {
    pub count: usize,
    pub preview: String,
}

/// Per-run bookkeeping keyed by fingerprint. Never outlives one `run`.
#[derive(Default)]
struct DedupState {
    counts: HashMap<String, usize>,
    previews: HashMap<String, String>,
    /// Fingerprints in first-seen order, for stable tie-breaks.
    order: Vec<String>,
}

impl DedupState {
    /// Record one sighting. Returns the preview if it was already seen.
    fn observe(&mut self, fingerprint: String, text: &str, preview_chars: usize) -> Option<&str> {
        if let Some(count) = self.counts.get_mut(&fingerprint) {
            *count += 1;
            return self.previews.get(&fingerprint).map(String::as_str);
        }
        self.counts.insert(fingerprint.clone(), 1);
        self.previews
            .insert(fingerprint.clone(), preview(text, preview_chars));
        self.order.push(fingerprint);
        None
    }

    fn top_repeated(&self, n: usize) -> Vec<RepeatedBlock> {
        let mut repeated: Vec<RepeatedBlock> = self
            .order
            .iter()
            .filter_map(|fp| {
                let count = self.counts[fp];
                (count > 1).then(|| RepeatedBlock {
                    count,
                    preview: self.previews[fp].clone(),
                })
            })
            .collect();
        // Stable sort keeps first-seen order among equal counts.
        repeated.sort_by(|a, b| b.count.cmp(&a.count));
        repeated.truncate(n);
        repeated
    }
}

/// First line of `text`, cut to `max` chars. A leading tag-only line
/// (`ASSISTANT:`) is skipped in favour of the line under it.
pub fn preview(text: &str, max: usize) -> String {
    let mut lines = text.lines().map(str::trim);
    let first = match lines.next() {
        Some(tag) if is_tag_line(tag) => lines.next().unwrap_or(tag),
        line => line.unwrap_or(""),
    };
    match first.char_indices().nth(max) {
        None => first.to_string(),
        Some((byte_idx, _)) => first[..byte_idx].to_string(),
    }
}

pub struct DedupOutcome {
    pub blocks: Vec<Block>,
    pub repeated: Vec<RepeatedBlock>,
    /// Content blocks (not session headers) that entered the pass.
    pub messages_before: usize,
    /// Content blocks kept verbatim.
    pub messages_after: usize,
}

/// Block-level deduplication: first occurrence wins, in block order.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    pub mode: DedupMode,
    pub preview_chars: usize,
    pub top_repeated: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            mode: DedupMode::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            top_repeated: DEFAULT_TOP_REPEATED,
        }
    }
}

impl Deduplicator {
    pub fn new(mode: DedupMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn run(&self, blocks: Vec<Block>) -> DedupOutcome {
        let mut state = DedupState::default();
        let mut out = Vec::with_capacity(blocks.len());
        let mut messages_before = 0;
        let mut messages_after = 0;

        for block in blocks {
            // Session headers and blank separators are structure, not content.
            if block.is_session_header() || block.text.trim().is_empty() {
                out.push(block);
                continue;
            }
            messages_before += 1;

            let fingerprint = normalize(&block.text);
            match state.observe(fingerprint, &block.text, self.preview_chars) {
                None => {
                    messages_after += 1;
                    out.push(block);
                }
                Some(preview) => {
                    if self.mode == DedupMode::Aggressive {
                        out.push(Block::new(
                            block.label,
                            format!("(deduped repeated block: {preview} …)"),
                        ));
                    }
                }
            }
        }

        let repeated = state.top_repeated(self.top_repeated);
        debug!(
            before = messages_before,
            after = messages_after,
            distinct_repeats = repeated.len(),
            "block dedup finished"
        );
        DedupOutcome {
            blocks: out,
            repeated,
            messages_before,
            messages_after,
        }
    }
}

/// Join blocks into the paragraph-separated document the later passes use.
pub fn render(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
