//! Boundary planning: turn word timestamps into cut points that never split a word.
//!
//! For every multiple of the target duration that falls inside the narration,
//! the word whose end lies closest to it is chosen. A word that closes a
//! sentence (terminal punctuation, or followed by a pause) may replace the
//! running best when it is within 1.5x of the best distance so far, so
//! narration tends to break between sentences rather than inside them.

use crate::defaults::{MAX_SPLIT_TARGETS, PAUSE_THRESHOLD_SECS, SENTENCE_END_TOLERANCE};
use crate::error::{ReelError, Result};
use crate::timing::{WordTimestamp, total_duration};
use serde::{Deserialize, Serialize};

/// Ordered cut points, in seconds.
///
/// A raw plan can repeat a boundary when two targets resolve to the same
/// word; [`SplitPlan::normalized`] produces the strictly increasing form the
/// slicer accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitPlan {
    boundaries: Vec<f64>,
}

impl SplitPlan {
    pub fn new(boundaries: Vec<f64>) -> Self {
        Self { boundaries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Number of segments this plan yields.
    pub fn segment_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Drop repeated boundaries and any that fall outside `(0, total)`.
    pub fn normalized(&self, total: f64) -> SplitPlan {
        let mut kept: Vec<f64> = Vec::with_capacity(self.boundaries.len());
        for &b in &self.boundaries {
            if b <= 0.0 || b >= total {
                continue;
            }
            if kept.last().is_some_and(|&last| b <= last) {
                continue;
            }
            kept.push(b);
        }
        SplitPlan::new(kept)
    }

    /// Whether boundaries are strictly increasing and inside `(0, total)`.
    pub fn is_valid_for(&self, total: f64) -> bool {
        self.boundaries.iter().all(|&b| b > 0.0 && b < total)
            && self.boundaries.windows(2).all(|w| w[0] < w[1])
    }

    /// Half-open `[start, end)` intervals covering `[0, total)`.
    pub fn intervals(&self, total: f64) -> Vec<(f64, f64)> {
        let mut edges = Vec::with_capacity(self.boundaries.len() + 2);
        edges.push(0.0);
        edges.extend_from_slice(&self.boundaries);
        edges.push(total);
        edges.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

/// Compute cut points near every multiple of `target_duration`.
///
/// Returns an empty plan for empty or single-word input, meaning "do not split".
///
/// # Errors
///
/// Returns `ReelError::Input` if `target_duration` is not a positive finite
/// number, if the narration length is not finite, or if the target is so
/// small that the narration would need more than [`MAX_SPLIT_TARGETS`] cuts.
pub fn plan(timestamps: &[WordTimestamp], target_duration: f64) -> Result<SplitPlan> {
    if !target_duration.is_finite() || target_duration <= 0.0 {
        return Err(ReelError::input(format!(
            "target duration must be a positive number of seconds, got {target_duration}"
        )));
    }
    if timestamps.len() < 2 {
        return Ok(SplitPlan::empty());
    }

    let total = total_duration(timestamps);
    if !total.is_finite() {
        return Err(ReelError::input("word timestamps must be finite"));
    }

    let steps = (total / target_duration).ceil();
    if steps > MAX_SPLIT_TARGETS as f64 {
        return Err(ReelError::input(format!(
            "target duration {target_duration}s would cut {total:.1}s of narration into \
             more than {MAX_SPLIT_TARGETS} segments"
        )));
    }

    let mut boundaries = Vec::new();
    // `steps` is at most MAX_SPLIT_TARGETS here, and negative totals cast to 0.
    for step in 1..=steps as usize {
        let target = step as f64 * target_duration;
        if target >= total {
            break;
        }
        let best = closest_word_end(timestamps, target);
        boundaries.push(timestamps[best].end);
    }

    Ok(SplitPlan::new(boundaries))
}

/// Index of the word whose end best matches `target`.
fn closest_word_end(timestamps: &[WordTimestamp], target: f64) -> usize {
    let mut best_index = 0;
    let mut best_diff = f64::INFINITY;

    for (i, word) in timestamps.iter().enumerate() {
        let diff = (word.end - target).abs();
        if diff < best_diff
            || (diff < best_diff * SENTENCE_END_TOLERANCE && is_sentence_end(timestamps, i))
        {
            best_diff = diff;
            best_index = i;
        }
    }

    best_index
}

/// A word ends a sentence if it is not the last word and either carries
/// terminal punctuation or is followed by a pause.
fn is_sentence_end(timestamps: &[WordTimestamp], i: usize) -> bool {
    let Some(next) = timestamps.get(i + 1) else {
        return false;
    };
    let word = &timestamps[i];
    word.ends_sentence() || next.start - word.end > PAUSE_THRESHOLD_SECS
}
