use crate::blocks::{Actor, Block, extract_all};
use crate::codeblocks::dedup_code_blocks;
use crate::dedup::{Deduplicator, RepeatedBlock, render};
use crate::error::{Result, TrimError};
use crate::preferences::Preferences;
use crate::sections::SectionPruner;
use crate::tokens::{CharEstimator, TokenEstimator};
use crate::transcript::read_session;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

// ===================================================================
// Session files
// ===================================================================

/// One session log on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    pub session_id: String,
    pub path: PathBuf,
    #[serde(skip)]
    pub mtime: Option<SystemTime>,
}

impl SessionFile {
    pub fn new(session_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            path: path.into(),
            mtime: None,
        }
    }
}

/// List the `*.jsonl` session logs in `dir`, newest first. The session id
/// is the file stem. Ties on modification time fall back to file name.
pub fn discover_sessions(dir: &Path) -> Result<Vec<SessionFile>> {
    let read_dir = fs::read_dir(dir).map_err(|e| TrimError::io(dir, e))?;
    let mut sessions = Vec::new();
    for dirent in read_dir {
        let dirent = dirent.map_err(|e| TrimError::io(dir, e))?;
        let path = dirent.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let meta = dirent.metadata().map_err(|e| TrimError::io(&path, e))?;
        if !meta.is_file() {
            continue;
        }
        sessions.push(SessionFile {
            session_id: stem.to_string(),
            mtime: meta.modified().ok(),
            path,
        });
    }
    sessions.sort_by(|a, b| b.mtime.cmp(&a.mtime).then_with(|| a.path.cmp(&b.path)));
    Ok(sessions)
}

// ===================================================================
// Result
// ===================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeMeta {
    pub messages_before: usize,
    pub messages_after: usize,
    pub top_repeated_blocks: Vec<RepeatedBlock>,
    pub section_dedup_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeResult {
    pub text: String,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub reduction_percent: i64,
    pub meta: SanitizeMeta,
}

/// Rounded percentage saved going from `before` to `after` tokens. Negative
/// when the output grew.
pub fn reduction_percent(before: usize, after: usize) -> i64 {
    if before == 0 {
        return 0;
    }
    ((before as f64 - after as f64) * 100.0 / before as f64).round() as i64
}

// ===================================================================
// Pipeline
// ===================================================================

/// Reads the current and previous session, then runs block dedup, section
/// pruning and code-block dedup in that order. Holds no state between runs.
pub struct Pipeline {
    prefs: Preferences,
    estimator: Box<dyn TokenEstimator>,
}

impl Pipeline {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            estimator: Box::new(CharEstimator),
        }
    }

    /// Swap in a different token counter.
    pub fn with_estimator(mut self, estimator: impl TokenEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// Render the header block that opens a session.
    pub fn session_header(&self, session_id: &str, position: &str) -> Result<Block> {
        let env = Environment::new();
        let tmpl = env
            .template_from_str(&self.prefs.session_header_template)
            .map_err(|e| TrimError::Template(format!("parsing template: {e}")))?;
        let rendered = tmpl
            .render(context! { session_id, position })
            .map_err(|e| TrimError::Template(format!("rendering template: {e}")))?;
        let rendered = rendered.trim();
        if !rendered.starts_with("# ") || rendered.contains('\n') {
            return Err(TrimError::Template(format!(
                "session header must be a single top-level heading line, got {rendered:?}"
            )));
        }
        Ok(Block::new(Actor::Session, rendered))
    }

    /// Read up to two sessions (current, previous) and lay their blocks out
    /// current first, each under its own header. The two files are read
    /// concurrently.
    pub fn load_blocks(&self, sessions: &[SessionFile]) -> Result<Vec<Block>> {
        let current = sessions.first();
        let previous = sessions.get(1);

        let read = |s: Option<&SessionFile>| -> Result<Option<Vec<Block>>> {
            match s {
                Some(s) => Ok(Some(extract_all(&read_session(&s.path)?))),
                None => Ok(None),
            }
        };
        let (current_blocks, previous_blocks) = rayon::join(|| read(current), || read(previous));

        let mut blocks = Vec::new();
        for (session, session_blocks, position) in [
            (current, current_blocks?, "current"),
            (previous, previous_blocks?, "previous"),
        ] {
            if let (Some(session), Some(session_blocks)) = (session, session_blocks) {
                debug!(
                    session = %session.session_id,
                    position,
                    blocks = session_blocks.len(),
                    "loaded session"
                );
                blocks.push(self.session_header(&session.session_id, position)?);
                blocks.extend(session_blocks);
            }
        }
        Ok(blocks)
    }

    /// Run the in-memory passes over an already laid-out block list.
    pub fn sanitize_blocks(&self, blocks: Vec<Block>) -> SanitizeResult {
        let tokens_before = self.estimator.estimate(&render(&blocks));

        let deduper = Deduplicator {
            mode: self.prefs.dedup_mode,
            preview_chars: self.prefs.preview_chars,
            top_repeated: self.prefs.top_repeated,
        };
        let deduped = deduper.run(blocks);

        let pruner = SectionPruner::new(
            self.prefs.curated_headings.clone(),
            self.prefs.discover_headings,
        );
        let pruned = pruner.prune(&render(&deduped.blocks));

        let code = dedup_code_blocks(&pruned.text);

        let tokens_after = self.estimator.estimate(&code.text);
        let result = SanitizeResult {
            text: code.text,
            tokens_before,
            tokens_after,
            reduction_percent: reduction_percent(tokens_before, tokens_after),
            meta: SanitizeMeta {
                messages_before: deduped.messages_before,
                messages_after: deduped.messages_after,
                top_repeated_blocks: deduped.repeated,
                section_dedup_counts: pruned.counts,
            },
        };
        info!(
            tokens_before,
            tokens_after,
            reduction_percent = result.reduction_percent,
            code_blocks_collapsed = code.collapsed,
            "sanitized session logs"
        );
        result
    }

    /// Full pipeline over the newest-first session list.
    pub fn sanitize(&self, sessions: &[SessionFile]) -> Result<SanitizeResult> {
        let blocks = self.load_blocks(sessions)?;
        Ok(self.sanitize_blocks(blocks))
    }

    /// Discover sessions in `dir` and sanitize the newest two.
    pub fn sanitize_dir(&self, dir: &Path) -> Result<SanitizeResult> {
        let sessions = discover_sessions(dir)?;
        self.sanitize(&sessions)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}
