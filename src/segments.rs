//! Paragraph segmentation shared by the budgeter and the views.

use regex::Regex;
use std::sync::LazyLock;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("static regex"));

pub const SEPARATOR: &str = "\n\n";

/// Split `text` on blank lines. Whitespace-only segments are dropped.
pub fn split_segments(text: &str) -> Vec<&str> {
    BLANK_LINE
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// The first `max` chars of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        assert_eq!(
            split_segments("a\nb\n\nc\n \n\n\nd\n"),
            vec!["a\nb", "c", "d\n"]
        );
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(split_segments("").is_empty());
        assert!(split_segments("\n\n  \n").is_empty());
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }
}
