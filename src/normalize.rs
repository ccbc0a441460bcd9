//! Fingerprinting: fold volatile content so re-rendered text compares equal.
//!
//! The output is only ever compared, never shown.

use regex::Regex;
use std::sync::LazyLock;

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}")
        .expect("static regex")
});

static ISO_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("static regex")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static regex"));

static LAST_UPDATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)last[\s_-]*updated").expect("static regex"));

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

static HSPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("static regex"));

static TRAILING_HSPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \n").expect("static regex"));

/// Replace UUID-shaped runs until none is left. A replacement can expose a
/// new match (the trailing `d` of `uuid` joining the hex after it), and each
/// pass shortens the text, so this terminates.
fn fold_uuids(text: &str) -> String {
    let mut s = UUID.replace_all(text, "uuid").into_owned();
    while UUID.is_match(&s) {
        s = UUID.replace_all(&s, "uuid").into_owned();
    }
    s
}

/// Canonical fingerprint of `text`. Idempotent.
pub fn normalize(text: &str) -> String {
    let s = fold_uuids(text);
    let s = ISO_DATETIME.replace_all(&s, "iso-date");
    let s = DATE.replace_all(&s, "date");

    let s: String = s
        .split_inclusive('\n')
        .filter(|line| !LAST_UPDATED.is_match(line))
        .collect();

    let s = DIGITS.replace_all(&s, "0");
    // Folding digit runs can shorten a group into UUID shape.
    let s = fold_uuids(&s).to_lowercase();
    let s = HSPACE.replace_all(&s, " ");
    let s = TRAILING_HSPACE.replace_all(&s, "\n");
    s.trim().to_string()
}
