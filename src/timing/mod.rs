//! Word-level speech timing and segment boundary planning.

pub mod segmenter;

pub use segmenter::{SplitPlan, plan};

use serde::{Deserialize, Serialize};

/// One spoken word with its position in the narration, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTimestamp {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    /// Whether the word text closes a sentence.
    pub fn ends_sentence(&self) -> bool {
        self.word.ends_with(['.', '!', '?'])
    }
}

/// Total narration length: the end of the last word.
pub fn total_duration(timestamps: &[WordTimestamp]) -> f64 {
    timestamps.last().map(|w| w.end).unwrap_or(0.0)
}

/// Load a timestamp sequence from JSON.
///
/// Accepts either a bare array of words or an object carrying a
/// `timestamps` array (the shape the synthesis endpoint returns).
pub fn from_json(text: &str) -> crate::Result<Vec<WordTimestamp>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Bare(Vec<WordTimestamp>),
        Wrapped { timestamps: Vec<WordTimestamp> },
    }

    let words = match serde_json::from_str::<Shape>(text)? {
        Shape::Bare(words) | Shape::Wrapped { timestamps: words } => words,
    };
    Ok(words)
}
