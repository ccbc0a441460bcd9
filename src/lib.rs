//! Trim line-delimited conversation logs into a compact, de-duplicated,
//! budget-bounded text for a model with a finite context window.
//!
//! Data flow: [`transcript`] reads entries, [`blocks`] turns them into
//! labeled blocks, then [`pipeline`] runs block dedup ([`dedup`]), section
//! pruning ([`sections`]) and code-block dedup ([`codeblocks`]). The result
//! can be fitted to a budget ([`budget`]) or queried ([`views`]).

pub mod blocks;
pub mod budget;
pub mod codeblocks;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod preferences;
pub mod sections;
pub mod segments;
pub mod tokens;
pub mod tool;
pub mod transcript;
pub mod views;

pub use error::{Result, TrimError};
pub use pipeline::{Pipeline, SanitizeResult, SessionFile};
pub use preferences::Preferences;
