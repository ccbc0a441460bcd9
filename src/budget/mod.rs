use crate::error::{Result, TrimError};
use crate::sections::is_heading;
use crate::segments::{join_segments, split_segments, truncate_chars};
use crate::tokens::TokenEstimator;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_CAP: usize = 200;
pub const MAX_CAP: usize = 4000;
pub const TRUNCATED_MARKER: &str = "\n(truncated)";

/// Truncation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Cap each body segment at the p90 body length; total length is not
    /// enforced.
    #[default]
    PerMessageCap,
    /// Keep segments in order until the token allowance runs out.
    RollingBudget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetMeta {
    pub cap_used: Option<usize>,
    pub truncated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResult {
    pub text: String,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub meta: BudgetMeta,
}

/// Nearest-rank percentile without interpolation: `sorted[floor(q * (n-1))]`.
/// Returns 0 for an empty slice.
pub fn percentile(values: &[usize], q: f64) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = (q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).floor() as usize;
    sorted[idx]
}

fn is_heading_segment(segment: &str) -> bool {
    segment.lines().next().is_some_and(is_heading)
}

/// Fit `text` to `target_tokens` using `strategy`.
pub fn apply_budget(
    text: &str,
    target_tokens: usize,
    strategy: Strategy,
    estimator: &dyn TokenEstimator,
) -> Result<BudgetResult> {
    let segments = split_segments(text);
    let (out, meta) = match strategy {
        Strategy::PerMessageCap => per_message_cap(&segments),
        Strategy::RollingBudget => {
            if target_tokens == 0 {
                return Err(TrimError::InvalidArgument(
                    "rollingBudget needs a token budget greater than zero".into(),
                ));
            }
            rolling_budget(&segments, target_tokens, estimator)
        }
    };

    let text_out = join_segments(&out);
    let result = BudgetResult {
        tokens_before: estimator.estimate(text),
        tokens_after: estimator.estimate(&text_out),
        text: text_out,
        meta,
    };
    debug!(
        ?strategy,
        before = result.tokens_before,
        after = result.tokens_after,
        truncated = result.meta.truncated_count,
        "budget applied"
    );
    Ok(result)
}

fn per_message_cap(segments: &[&str]) -> (Vec<String>, BudgetMeta) {
    let body_lengths: Vec<usize> = segments
        .iter()
        .filter(|s| !is_heading_segment(s))
        .map(|s| s.chars().count())
        .collect();
    let cap = percentile(&body_lengths, 0.9).clamp(MIN_CAP, MAX_CAP);

    let mut truncated_count = 0;
    let out = segments
        .iter()
        .map(|&seg| {
            if is_heading_segment(seg) || seg.chars().count() <= cap {
                seg.to_string()
            } else {
                truncated_count += 1;
                format!("{}{TRUNCATED_MARKER}", truncate_chars(seg, cap))
            }
        })
        .collect();

    (
        out,
        BudgetMeta {
            cap_used: Some(cap),
            truncated_count,
        },
    )
}

fn rolling_budget(
    segments: &[&str],
    target_tokens: usize,
    estimator: &dyn TokenEstimator,
) -> (Vec<String>, BudgetMeta) {
    let mut remaining = target_tokens;
    let mut out = Vec::new();
    let mut truncated_count = 0;

    for &seg in segments {
        // One extra token for the separator.
        let cost = estimator.estimate(seg) + 1;
        if cost <= remaining {
            out.push(seg.to_string());
            remaining -= cost;
            continue;
        }
        if !is_heading_segment(seg) {
            // The separator and the marker are paid for out of what is left.
            let reserve = 1 + estimator.estimate(TRUNCATED_MARKER);
            let chars = estimator.chars_for_tokens(remaining.saturating_sub(reserve));
            let kept = truncate_chars(seg, chars);
            if !kept.trim().is_empty() {
                out.push(format!("{kept}{TRUNCATED_MARKER}"));
                truncated_count += 1;
            }
        }
        break;
    }

    (
        out,
        BudgetMeta {
            cap_used: None,
            truncated_count,
        },
    )
}
