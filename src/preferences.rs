use crate::dedup::{DEFAULT_PREVIEW_CHARS, DEFAULT_TOP_REPEATED, DedupMode};
use crate::sections::DEFAULT_CURATED_HEADINGS;
use crate::views::DEFAULT_WINDOW_LINES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const FILENAME: &str = "logtrim.toml";

pub const DEFAULT_SESSION_HEADER: &str = "# Session {{ session_id }} ({{ position }})";

/// Pipeline settings, read from `logtrim.toml`.
///
/// ```toml
/// dedup_mode = "aggressive"
/// curated_headings = ["Project Memory", "Current Working Plan"]
/// discover_headings = false
/// session_header_template = "# Session {{ session_id }} ({{ position }})"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// "basic" drops repeated blocks, "aggressive" leaves a marker.
    #[serde(default)]
    pub dedup_mode: DedupMode,

    /// Headings whose later bodies are collapsed, processed in this order.
    #[serde(default = "default_curated_headings")]
    pub curated_headings: Vec<String>,

    /// Also collapse every other recurring H1–H3 heading.
    #[serde(default)]
    pub discover_headings: bool,

    /// Jinja template for the line that opens each session. Gets
    /// `session_id` and `position` ("current" or "previous").
    #[serde(default = "default_session_header_template")]
    pub session_header_template: String,

    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default = "default_top_repeated")]
    pub top_repeated: usize,

    #[serde(default = "default_section_window_lines")]
    pub section_window_lines: usize,
}

fn default_curated_headings() -> Vec<String> {
    DEFAULT_CURATED_HEADINGS.iter().map(|s| s.to_string()).collect()
}

fn default_session_header_template() -> String {
    DEFAULT_SESSION_HEADER.into()
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_top_repeated() -> usize {
    DEFAULT_TOP_REPEATED
}

fn default_section_window_lines() -> usize {
    DEFAULT_WINDOW_LINES
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dedup_mode: DedupMode::default(),
            curated_headings: default_curated_headings(),
            discover_headings: false,
            session_header_template: default_session_header_template(),
            preview_chars: default_preview_chars(),
            top_repeated: default_top_repeated(),
            section_window_lines: default_section_window_lines(),
        }
    }
}

impl Preferences {
    /// Load preferences from a TOML file.
    ///
    /// A missing file means defaults. Missing keys in an existing file are
    /// filled in with defaults via serde.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let prefs: Preferences = toml::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Ok(prefs)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Look for `logtrim.toml` in `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load_from_dir(dir.path()).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(!dir.path().join(FILENAME).exists());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FILENAME),
            "dedup_mode = \"aggressive\"\ncurated_headings = [\"Plan\"]\n",
        )
        .unwrap();

        let prefs = Preferences::load_from_dir(dir.path()).unwrap();
        assert_eq!(prefs.dedup_mode, DedupMode::Aggressive);
        assert_eq!(prefs.curated_headings, vec!["Plan".to_string()]);
        assert_eq!(prefs.session_header_template, DEFAULT_SESSION_HEADER);
        assert_eq!(prefs.preview_chars, DEFAULT_PREVIEW_CHARS);
    }

    #[test]
    fn empty_heading_list_is_allowed() {
        let prefs: Preferences = toml::from_str("curated_headings = []").unwrap();
        assert!(prefs.curated_headings.is_empty());
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILENAME), "dedup_mode = [").unwrap();
        let err = Preferences::load_from_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn round_trips_through_toml() {
        let prefs = Preferences::default();
        let s = toml::to_string_pretty(&prefs).unwrap();
        let back: Preferences = toml::from_str(&s).unwrap();
        assert_eq!(back, prefs);
    }
}
