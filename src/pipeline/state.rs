//! Run lifecycle states and the transition tracker.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Stage of a single pipeline run.
///
/// Runs move forward through the stages in order. `Failed` is reachable from
/// every non-terminal stage; a run with a single segment skips straight from
/// `GeneratingVideo` to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    Synthesizing,
    Segmenting,
    Slicing,
    GeneratingVideo,
    Downloading,
    Concatenating,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// Whether a run may move from `self` to `next`.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Start, Synthesizing)
                | (Synthesizing, Segmenting)
                | (Segmenting, Slicing)
                | (Slicing, GeneratingVideo)
                | (GeneratingVideo, Downloading)
                | (GeneratingVideo, Done)
                | (Downloading, Concatenating)
                | (Concatenating, Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::Synthesizing => "synthesizing",
            RunState::Segmenting => "segmenting",
            RunState::Slicing => "slicing",
            RunState::GeneratingVideo => "generating video",
            RunState::Downloading => "downloading",
            RunState::Concatenating => "concatenating",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one run's progress through its states, with per-stage timing.
#[derive(Debug)]
pub struct RunTracker {
    current: RunState,
    entered_at: Instant,
    history: Vec<(RunState, Duration)>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            current: RunState::Start,
            entered_at: Instant::now(),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    /// Move to `next`.
    ///
    /// An illegal transition is logged and ignored; the tracker stays where it
    /// was.
    pub fn advance(&mut self, next: RunState) {
        if !self.current.can_transition_to(next) {
            tracing::warn!(from = %self.current, to = %next, "ignoring illegal run transition");
            return;
        }
        let elapsed = self.entered_at.elapsed();
        tracing::debug!(
            from = %self.current,
            to = %next,
            elapsed_ms = elapsed.as_millis() as u64,
            "run state change"
        );
        self.history.push((self.current, elapsed));
        self.current = next;
        self.entered_at = Instant::now();
    }

    /// Mark the run failed.
    pub fn fail(&mut self) {
        self.advance(RunState::Failed);
    }

    /// Every state visited so far, ending with the current one.
    pub fn states(&self) -> Vec<RunState> {
        self.history
            .iter()
            .map(|(state, _)| *state)
            .chain(std::iter::once(self.current))
            .collect()
    }

    /// Time spent in each completed state.
    pub fn timings(&self) -> &[(RunState, Duration)] {
        &self.history
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}
