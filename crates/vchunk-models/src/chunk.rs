//! Chunk specs and per-chunk execution outcomes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cut_points::{ChunkRange, CutPoints};

/// One unit of work for the chunk executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSpec {
    /// Source time range
    pub range: ChunkRange,
    /// 1-based position of the chunk within its file
    pub index: usize,
    /// Where the materialized chunk is written
    pub output: PathBuf,
}

impl ChunkSpec {
    /// Derive one spec per cut-point pair (plus the tail up to `total`).
    ///
    /// `output_for` receives the 1-based chunk index.
    pub fn from_cut_points<F>(cuts: &CutPoints, total: f64, mut output_for: F) -> Vec<ChunkSpec>
    where
        F: FnMut(usize) -> PathBuf,
    {
        cuts.ranges(total)
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let index = i + 1;
                ChunkSpec {
                    range,
                    index,
                    output: output_for(index),
                }
            })
            .collect()
    }
}

/// Terminal state of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    Completed { index: usize, output: PathBuf },
    Failed { index: usize, cause: String },
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        match self {
            ChunkOutcome::Completed { index, .. } | ChunkOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ChunkOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_from_cut_points() {
        let cuts = CutPoints::from_vec(vec![0.0, 120.0, 240.0], 300.0).unwrap();
        let specs = ChunkSpec::from_cut_points(&cuts, 300.0, |i| PathBuf::from(format!("part{i}.mp4")));

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].index, 1);
        assert_eq!(specs[2].range, ChunkRange { start: 240.0, end: 300.0 });
        assert_eq!(specs[2].output, PathBuf::from("part3.mp4"));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let outcome = ChunkOutcome::Failed {
            index: 2,
            cause: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["index"], 2);
        assert!(!outcome.is_completed());
    }
}
