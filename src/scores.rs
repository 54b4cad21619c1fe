//! External score submission
//!
//! Fired best-effort on every terminal phase transition. A failing sink never
//! touches game state: the `Game` logs the error and moves on.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishMode {
    Slide,
    Crash,
}

/// One finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Whole meters
    pub distance: u32,
    pub power: f32,
    pub angle: f32,
    pub mode: FinishMode,
}

impl ScoreSubmission {
    pub fn new(distance: f32, power: f32, angle: f32, mode: FinishMode) -> Self {
        Self {
            distance: distance.max(0.0).round() as u32,
            power,
            angle,
            mode,
        }
    }
}

/// Destination for finished runs (remote leaderboard, analytics, ...)
pub trait ScoreSink {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), SubmitError>;
}

/// No remote leaderboard configured: submissions are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ScoreSink for NullSink {
    fn submit(&mut self, _submission: &ScoreSubmission) -> Result<(), SubmitError> {
        Ok(())
    }
}

/// Keeps submissions in memory. Clones share the same buffer, so an embedder
/// can hand one to the `Game` and forward the other's contents elsewhere.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    submissions: Rc<RefCell<Vec<ScoreSubmission>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<ScoreSubmission> {
        self.submissions.borrow().clone()
    }

    /// Take everything recorded so far
    pub fn drain(&self) -> Vec<ScoreSubmission> {
        std::mem::take(&mut *self.submissions.borrow_mut())
    }
}

impl ScoreSink for RecordingSink {
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<(), SubmitError> {
        self.submissions.borrow_mut().push(submission.clone());
        Ok(())
    }
}
