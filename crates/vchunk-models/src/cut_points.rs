//! Cut-point sequences and the chunk ranges they imply.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-level errors that make planning impossible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Target duration must be a positive number of seconds, got {0}")]
    InvalidTargetDuration(f64),

    #[error("Search window must be a non-negative number of seconds, got {0}")]
    InvalidSearchWindow(f64),

    #[error("Total duration must be a non-negative number of seconds, got {0}")]
    InvalidTotalDuration(f64),

    #[error("Invalid cut point sequence: {0}")]
    InvalidSequence(String),
}

/// Shortest chunk a cut may leave on either side, in seconds.
///
/// Anything shorter rounds to an empty `-t 0.000` encode.
pub const MIN_CHUNK_SECS: f64 = 0.001;

/// Ordered cut points for one file.
///
/// Always starts at 0, strictly increasing, every element below the file's
/// total duration. The end of the file is implicit and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CutPoints(Vec<f64>);

impl Default for CutPoints {
    fn default() -> Self {
        Self::new()
    }
}

impl CutPoints {
    /// The single-chunk sequence `[0]`.
    pub fn new() -> Self {
        Self(vec![0.0])
    }

    /// Build from raw seconds, checking every invariant against `total`.
    pub fn from_vec(points: Vec<f64>, total: f64) -> Result<Self, PlanError> {
        match points.first() {
            Some(first) if *first == 0.0 => {}
            _ => {
                return Err(PlanError::InvalidSequence(
                    "first cut point must be 0".to_string(),
                ))
            }
        }
        if let Some(pair) = points.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PlanError::InvalidSequence(format!(
                "cut points must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
        if points.len() > 1 && points.last().is_some_and(|last| *last >= total) {
            return Err(PlanError::InvalidSequence(format!(
                "last cut point must be below the total duration {}",
                total
            )));
        }
        Ok(Self(points))
    }

    /// Append `candidate` if it lies strictly between the last cut and `total`,
    /// at least [`MIN_CHUNK_SECS`] from both.
    ///
    /// Returns `false` (and leaves the sequence untouched) otherwise; the
    /// planner treats that as the end of the file.
    pub fn try_push(&mut self, candidate: f64, total: f64) -> bool {
        if candidate.is_finite()
            && candidate - self.last() >= MIN_CHUNK_SECS
            && total - candidate >= MIN_CHUNK_SECS
        {
            self.0.push(candidate);
            true
        } else {
            false
        }
    }

    /// Most recent cut point.
    pub fn last(&self) -> f64 {
        self.0.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no cut points at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Pair consecutive cut points, closing the last range at `total`.
    pub fn ranges(&self, total: f64) -> Vec<ChunkRange> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &start)| ChunkRange {
                start,
                end: self.0.get(i + 1).copied().unwrap_or(total),
            })
            .collect()
    }
}

impl AsRef<[f64]> for CutPoints {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Half-open time range `[start, end)` of a chunk, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: f64,
    pub end: f64,
}

impl ChunkRange {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}
