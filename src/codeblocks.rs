//! Collapse repeated fenced code regions, independent of surrounding prose.

use crate::normalize::normalize;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*```[^`]*$").expect("static regex"));

static CLOSE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*```[ \t]*$").expect("static regex"));

/// Byte range of one fenced region, from the opening fence line through the
/// closing fence (newline excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRegion {
    pub start: usize,
    pub end: usize,
}

/// Find closed fenced regions in document order. An unclosed fence is not a
/// region.
pub fn find_code_regions(text: &str) -> Vec<CodeRegion> {
    let mut regions = Vec::new();
    let mut open: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let bare = line.trim_end_matches(['\r', '\n']);

        match open {
            None if OPEN_FENCE.is_match(bare) => open = Some(start),
            Some(region_start) if CLOSE_FENCE.is_match(bare) => {
                regions.push(CodeRegion {
                    start: region_start,
                    end: start + bare.len(),
                });
                open = None;
            }
            _ => {}
        }
    }
    regions
}

pub struct CodeDedupOutcome {
    pub text: String,
    pub collapsed: usize,
}

/// Keep the first copy of each normalized code region verbatim and replace
/// later copies whole with a marker carrying the running repeat count.
pub fn dedup_code_blocks(text: &str) -> CodeDedupOutcome {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut collapsed = 0;

    for region in find_code_regions(text) {
        let body = &text[region.start..region.end];
        let count = counts.entry(normalize(body)).or_insert(0);
        *count += 1;
        if *count == 1 {
            continue;
        }
        out.push_str(&text[cursor..region.start]);
        out.push_str(&format!("(duplicate code block deduped x{})", *count - 1));
        cursor = region.end;
        collapsed += 1;
    }
    out.push_str(&text[cursor..]);

    if collapsed > 0 {
        debug!(collapsed, "collapsed repeated code blocks");
    }
    CodeDedupOutcome {
        text: out,
        collapsed,
    }
}
