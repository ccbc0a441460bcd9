use crate::error::{Result, TrimError};
use crate::sections::scan_headings;
use crate::segments::{join_segments, split_segments};
use crate::tokens::TokenEstimator;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_WINDOW_LINES: usize = 10;
pub const DEFAULT_MAX_MATCHES: usize = 20;

/// Inclusive index range into the paragraph blocks of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

// ===================================================================
// Section extraction
// ===================================================================

/// How section keys are matched against heading names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMatch {
    /// Case-insensitive substring containment, ignoring whitespace runs.
    #[default]
    Substring,
    /// Each key is a regex.
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionText {
    pub text: String,
    pub tokens_estimate: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionsResult {
    pub sections: BTreeMap<String, SectionText>,
    /// Found keys, in the order their sections appear in the text.
    pub detected_order: Vec<String>,
    /// Every H1–H3 heading name in the text.
    pub detected_headings: Vec<String>,
    pub not_found: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum Matcher {
    Substring(String),
    Regex(Regex),
}

/// Lower-case with whitespace runs collapsed to one space and trimmed.
fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Matcher {
    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Substring(needle) => fold(haystack).contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(haystack),
        }
    }
}

/// Pull named sections out of `text`. A key that matches no heading falls
/// back to a ±`window_lines` window around the first line containing it.
pub fn extract_sections(
    text: &str,
    keys: &[String],
    mode: KeyMatch,
    window_lines: usize,
    estimator: &dyn TokenEstimator,
) -> SectionsResult {
    let headings = scan_headings(text);
    let lines: Vec<&str> = text.lines().collect();
    let mut result = SectionsResult {
        detected_headings: headings.iter().map(|h| h.name.clone()).collect(),
        ..Default::default()
    };
    let mut errors: Vec<String> = Vec::new();
    let mut found: Vec<(usize, String)> = Vec::new();

    for key in keys {
        let matcher = match mode {
            KeyMatch::Substring => Matcher::Substring(fold(key)),
            KeyMatch::Regex => match Regex::new(key) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    errors.push(format!("invalid pattern {key:?}: {e}"));
                    result.not_found.push(key.clone());
                    continue;
                }
            },
        };

        let hit = headings
            .iter()
            .find(|h| matcher.is_match(&h.name))
            .map(|h| (h.start, h.body(text).trim().to_string()))
            .or_else(|| {
                let i = lines.iter().position(|l| matcher.is_match(l))?;
                let start = i.saturating_sub(window_lines);
                let end = (i + window_lines).min(lines.len() - 1);
                Some((line_offset(&lines, i), lines[start..=end].join("\n")))
            });

        match hit {
            Some((position, body)) => {
                found.push((position, key.clone()));
                result.sections.insert(
                    key.clone(),
                    SectionText {
                        tokens_estimate: estimator.estimate(&body),
                        text: body,
                    },
                );
            }
            None => result.not_found.push(key.clone()),
        }
    }

    found.sort_by_key(|(position, _)| *position);
    result.detected_order = found.into_iter().map(|(_, key)| key).collect();
    if !errors.is_empty() {
        result.error = Some(errors.join("; "));
    }
    result
}

/// Approximate byte offset of line `i`, for ordering only.
fn line_offset(lines: &[&str], i: usize) -> usize {
    lines[..i].iter().map(|l| l.len() + 1).sum()
}

// ===================================================================
// Grep
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrepMatch {
    pub block_range: IndexRange,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrepResult {
    pub matches: Vec<GrepMatch>,
    pub match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrepResult {
    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Build a regex from a pattern and a flag string (`i`, `m`, `s`, `x`; `g`
/// and `u` are accepted and ignored).
pub fn build_regex(pattern: &str, flags: &str) -> std::result::Result<Regex, String> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'g' | 'u' => &mut builder,
            other => return Err(format!("unsupported regex flag {other:?}")),
        };
    }
    builder
        .size_limit(10 * (1 << 20))
        .build()
        .map_err(|e| format!("invalid regex: {e}"))
}

/// Match `pattern` against each paragraph block and return each hit with
/// ±`context` neighbouring blocks. An invalid pattern comes back as an
/// `error` field, not an `Err`.
pub fn grep(
    text: &str,
    pattern: &str,
    flags: &str,
    context: usize,
    max_matches: usize,
) -> Result<GrepResult> {
    if max_matches == 0 {
        return Err(TrimError::InvalidArgument(
            "maxMatches must be at least 1".into(),
        ));
    }
    let re = match build_regex(pattern, flags) {
        Ok(re) => re,
        Err(e) => return Ok(GrepResult::failed(e)),
    };

    let blocks = split_segments(text);
    let matches: Vec<GrepMatch> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| re.is_match(b))
        .take(max_matches)
        .map(|(i, _)| {
            let range = window(i, context, context, blocks.len());
            GrepMatch {
                block_range: range,
                text: join_segments(&blocks[range.start..=range.end]),
            }
        })
        .collect();

    Ok(GrepResult {
        match_count: matches.len(),
        matches,
        error: None,
    })
}

// ===================================================================
// Slice
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceResult {
    pub slice_text: String,
    pub indices: IndexRange,
    pub tokens_estimate: usize,
}

/// Blocks `[index - before, index + after]`, clamped to the text.
pub fn slice(
    text: &str,
    index: usize,
    before: usize,
    after: usize,
    estimator: &dyn TokenEstimator,
) -> SliceResult {
    let blocks = split_segments(text);
    if blocks.is_empty() {
        return SliceResult {
            slice_text: String::new(),
            indices: IndexRange { start: 0, end: 0 },
            tokens_estimate: 0,
        };
    }
    let index = index.min(blocks.len() - 1);
    let range = window(index, before, after, blocks.len());
    let slice_text = join_segments(&blocks[range.start..=range.end]);
    SliceResult {
        tokens_estimate: estimator.estimate(&slice_text),
        slice_text,
        indices: range,
    }
}

fn window(index: usize, before: usize, after: usize, len: usize) -> IndexRange {
    IndexRange {
        start: index.saturating_sub(before),
        end: index.saturating_add(after).min(len - 1),
    }
}
