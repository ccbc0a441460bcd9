use crate::blocks::is_fence;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

/// H1–H3 heading line.
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,3})[ \t]+(\S.*?)[ \t]*$").expect("static regex"));

/// Boilerplate headings that get re-rendered across session continuations.
pub const DEFAULT_CURATED_HEADINGS: &[&str] = &[
    "Project Memory",
    "Current Working Plan",
    "Session Continuity Reference",
    "Recent Conversation Log",
    "Session Start Context",
    "AI Analysis Prompt",
    "Input Context",
    "Output Requirements - MANDATORY FILE UPDATE",
    "Quality Requirements",
    "Session Analysis Guidelines",
    "Directory Structure",
    "Implementation Instructions",
];

// ===================================================================
// Heading scan
// ===================================================================

/// An H1–H3 heading found in sanitized text. Offsets are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub name: String,
    pub level: usize,
    /// Start of the heading line.
    pub start: usize,
    /// Just past the heading line (and its newline, if any).
    pub body_start: usize,
    /// Start of the next heading of any level, or end of text.
    pub end: usize,
}

impl Heading {
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body_start..self.end]
    }
}

/// Return `true` if `line` is an H1–H3 heading.
pub fn is_heading(line: &str) -> bool {
    HEADING.is_match(line.trim_end_matches(['\r', '\n']))
}

/// Scan `text` for H1–H3 headings outside fenced code, in document order.
pub fn scan_headings(text: &str) -> Vec<Heading> {
    let mut headings: Vec<Heading> = Vec::new();
    let mut offset = 0;
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let bare = line.trim_end_matches(['\r', '\n']);

        if is_fence(bare) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING.captures(bare) {
            if let Some(prev) = headings.last_mut() {
                prev.end = start;
            }
            headings.push(Heading {
                name: caps[2].to_string(),
                level: caps[1].len(),
                start,
                body_start: offset,
                end: text.len(),
            });
        }
    }
    headings
}

/// End of the section opened by `headings[i]`: the next heading of the same
/// or a higher level, or end of text.
fn section_end(headings: &[Heading], i: usize, text_len: usize) -> usize {
    let level = headings[i].level;
    headings[i + 1..]
        .iter()
        .find(|h| h.level <= level)
        .map_or(text_len, |h| h.start)
}

// ===================================================================
// Section pruner
// ===================================================================

/// Collapses all but the first body under each recurring heading name.
#[derive(Debug, Clone)]
pub struct SectionPruner {
    /// Names processed first, in this order.
    pub headings: Vec<String>,
    /// Also process every heading found in the text, in first-seen order.
    pub discover: bool,
}

impl Default for SectionPruner {
    fn default() -> Self {
        Self {
            headings: DEFAULT_CURATED_HEADINGS.iter().map(|s| s.to_string()).collect(),
            discover: false,
        }
    }
}

pub struct PruneOutcome {
    pub text: String,
    /// Heading name → number of bodies collapsed.
    pub counts: BTreeMap<String, usize>,
}

impl SectionPruner {
    pub fn new(headings: Vec<String>, discover: bool) -> Self {
        Self { headings, discover }
    }

    /// Heading names to process, in deterministic order.
    fn plan(&self, text: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for name in &self.headings {
            let name = name.trim();
            if !name.is_empty() && seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }
        if self.discover {
            for h in scan_headings(text) {
                if seen.insert(h.name.clone()) {
                    names.push(h.name);
                }
            }
        }
        names
    }

    pub fn prune(&self, text: &str) -> PruneOutcome {
        let mut text = text.to_string();
        let mut counts = BTreeMap::new();

        for name in self.plan(&text) {
            if let Some((pruned, collapsed)) = collapse_heading(&text, &name) {
                debug!(heading = %name, collapsed, "collapsed repeated section");
                counts.insert(name, collapsed);
                text = pruned;
            }
        }
        PruneOutcome { text, counts }
    }
}

/// Keep the first section titled `name` and replace the bodies of later
/// ones with a marker line. Returns `None` when the heading occurs at most
/// once.
fn collapse_heading(text: &str, name: &str) -> Option<(String, usize)> {
    let headings = scan_headings(text);

    // Non-overlapping matches in document order.
    let mut matches: Vec<(usize, usize)> = Vec::new();
    let mut last_end = 0;
    for (i, h) in headings.iter().enumerate() {
        if h.name != name || h.start < last_end {
            continue;
        }
        let end = section_end(&headings, i, text.len());
        matches.push((i, end));
        last_end = end;
    }
    if matches.len() < 2 {
        return None;
    }

    let collapsed = matches.len() - 1;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(i, end) in &matches[1..] {
        let h = &headings[i];
        out.push_str(&text[cursor..h.body_start]);
        if !text[..h.body_start].ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("({name} deduped x{collapsed})"));
        if end < text.len() {
            out.push_str("\n\n");
        }
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    Some((out, collapsed))
}
