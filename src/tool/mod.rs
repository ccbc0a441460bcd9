use crate::budget::{BudgetResult, Strategy, apply_budget};
use crate::error::{Result, TrimError};
use crate::pipeline::{Pipeline, SanitizeResult, SessionFile, discover_sessions};
use crate::views::{
    DEFAULT_MAX_MATCHES, GrepResult, KeyMatch, SectionsResult, SliceResult, extract_sections,
    grep, slice,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ===================================================================
// Requests (one JSON object on stdin, camelCase, tagged by "tool")
// ===================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum ToolRequest {
    Sanitize(SanitizeRequest),
    Budget(BudgetRequest),
    Sections(SectionsRequest),
    Grep(GrepRequest),
    Slice(SliceRequest),
}

/// Where session logs come from: an explicit newest-first list, or a
/// directory to discover them in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSource {
    #[serde(default)]
    pub sessions: Vec<SessionFile>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl SessionSource {
    fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.log_dir.is_none()
    }

    fn resolve(&self) -> Result<Vec<SessionFile>> {
        if !self.sessions.is_empty() {
            return Ok(self.sessions.clone());
        }
        match &self.log_dir {
            Some(dir) => discover_sessions(dir),
            None => Err(TrimError::InvalidArgument(
                "expected `sessions` or `logDir`".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeRequest {
    #[serde(flatten)]
    pub source: SessionSource,
}

/// Budget either raw `text` or, when absent, the sanitized sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub source: SessionSource,
    pub target_tokens: usize,
    #[serde(default)]
    pub strategy: Strategy,
}

/// The views below run over `text` when given, otherwise over the sanitized
/// sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionsRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub source: SessionSource,
    pub keys: Vec<String>,
    #[serde(default)]
    pub match_mode: KeyMatch,
    /// Falls back to the configured window.
    #[serde(default)]
    pub window_lines: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrepRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub source: SessionSource,
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
    #[serde(default = "default_grep_context")]
    pub context: usize,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

fn default_grep_context() -> usize {
    1
}

fn default_max_matches() -> usize {
    DEFAULT_MAX_MATCHES
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub source: SessionSource,
    pub index: usize,
    #[serde(default)]
    pub before: usize,
    #[serde(default)]
    pub after: usize,
}

// ===================================================================
// Output
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Sanitize(SanitizeResult),
    Budget(BudgetResult),
    Sections(SectionsResult),
    Grep(GrepResult),
    Slice(SliceResult),
}

// ===================================================================
// Dispatch
// ===================================================================

/// Raw `text` wins; otherwise sanitize the sessions named by `source`.
fn input_text(text: Option<&str>, source: &SessionSource, pipeline: &Pipeline) -> Result<String> {
    match (text, source.is_empty()) {
        (Some(text), _) => Ok(text.to_string()),
        (None, false) => Ok(pipeline.sanitize(&source.resolve()?)?.text),
        (None, true) => Err(TrimError::InvalidArgument(
            "expected `text`, `sessions` or `logDir`".into(),
        )),
    }
}

impl ToolRequest {
    /// Run the request against `pipeline`.
    pub fn execute(&self, pipeline: &Pipeline) -> Result<ToolOutput> {
        match self {
            ToolRequest::Sanitize(req) => {
                let sessions = req.source.resolve()?;
                Ok(ToolOutput::Sanitize(pipeline.sanitize(&sessions)?))
            }
            ToolRequest::Budget(req) => {
                let text = input_text(req.text.as_deref(), &req.source, pipeline)?;
                let result =
                    apply_budget(&text, req.target_tokens, req.strategy, pipeline.estimator())?;
                Ok(ToolOutput::Budget(result))
            }
            ToolRequest::Sections(req) => {
                let text = input_text(req.text.as_deref(), &req.source, pipeline)?;
                let window = req
                    .window_lines
                    .unwrap_or(pipeline.prefs().section_window_lines);
                Ok(ToolOutput::Sections(extract_sections(
                    &text,
                    &req.keys,
                    req.match_mode,
                    window,
                    pipeline.estimator(),
                )))
            }
            ToolRequest::Grep(req) => {
                let text = input_text(req.text.as_deref(), &req.source, pipeline)?;
                Ok(ToolOutput::Grep(grep(
                    &text,
                    &req.pattern,
                    &req.flags,
                    req.context,
                    req.max_matches,
                )?))
            }
            ToolRequest::Slice(req) => {
                let text = input_text(req.text.as_deref(), &req.source, pipeline)?;
                Ok(ToolOutput::Slice(slice(
                    &text,
                    req.index,
                    req.before,
                    req.after,
                    pipeline.estimator(),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests;
