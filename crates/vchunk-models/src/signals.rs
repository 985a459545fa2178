//! Detected audio/visual events used as cut candidates.

use serde::{Deserialize, Serialize};

/// A stretch of audio below the silence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceInterval {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// `end - start`, in seconds
    pub duration: f64,
}

impl SilenceInterval {
    /// Build an interval from its bounds.
    ///
    /// Returns `None` unless `0 <= start < end` and both are finite.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return None;
        }
        Some(Self {
            start,
            end,
            duration: end - start,
        })
    }

    /// Point halfway through the silence.
    pub fn midpoint(&self) -> f64 {
        self.start + (self.end - self.start) / 2.0
    }
}

/// Timestamp (seconds) of a detected scene change.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneMark(pub f64);

impl SceneMark {
    pub fn seconds(self) -> f64 {
        self.0
    }
}
