//! Token estimation.
//!
//! The default is a character heuristic: ~4 characters per token, rounded
//! up. Callers holding a real tokenizer implement [`TokenEstimator`] and
//! pass it in instead.

/// Pluggable token counter.
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text`.
    fn estimate(&self, text: &str) -> usize;

    /// Roughly how many characters `tokens` tokens buy. Used when a budget
    /// has to be turned back into a cut point.
    fn chars_for_tokens(&self, tokens: usize) -> usize {
        tokens * 4
    }
}

/// `ceil(chars / 4)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimator;

impl TokenEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
