//! Planner and detection configuration.
//!
//! Both are immutable values handed to each planning pass; nothing here is
//! read from global state.

use serde::{Deserialize, Serialize};

use crate::cut_points::PlanError;

/// Default target chunk length in seconds.
pub const DEFAULT_TARGET_DURATION: f64 = 120.0;
/// Default tolerance around the target, in seconds.
pub const DEFAULT_SEARCH_WINDOW: f64 = 20.0;
/// Default silencedetect noise floor in dB.
pub const DEFAULT_SILENCE_THRESHOLD_DB: f64 = -30.0;
/// Default minimum silence duration in seconds.
pub const DEFAULT_MIN_SILENCE_DURATION: f64 = 0.3;
/// Default scene-change score threshold.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.4;
/// Looser threshold used by the smart chain's scene probe.
pub const DEFAULT_SMART_SCENE_THRESHOLD: f64 = 0.3;

/// Windowed-search parameters for the segmentation planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Ideal chunk length in seconds
    pub target_duration: f64,
    /// Accepted deviation from the target on either side, in seconds
    pub search_window: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            target_duration: DEFAULT_TARGET_DURATION,
            search_window: DEFAULT_SEARCH_WINDOW,
        }
    }
}

impl PlannerConfig {
    pub fn new(target_duration: f64, search_window: f64) -> Self {
        Self {
            target_duration,
            search_window,
        }
    }

    /// Check the configuration invariants that make planning well defined.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.target_duration.is_finite() || self.target_duration <= 0.0 {
            return Err(PlanError::InvalidTargetDuration(self.target_duration));
        }
        if !self.search_window.is_finite() || self.search_window < 0.0 {
            return Err(PlanError::InvalidSearchWindow(self.search_window));
        }
        Ok(())
    }
}

/// Thresholds for the detection passes and the smart chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Noise floor below which audio counts as silence (dB)
    pub silence_threshold_db: f64,
    /// Silences shorter than this are discarded (seconds)
    pub min_silence_duration: f64,
    /// Scene score threshold for the `scene` strategy
    pub scene_threshold: f64,
    /// Scene score threshold for the smart chain's first probe
    pub smart_scene_threshold: f64,
    /// Scene marks required for the smart chain to pick `scene`
    pub smart_min_scene_marks: usize,
    /// Silence intervals required for the smart chain to pick `silence`
    pub smart_min_silences: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            min_silence_duration: DEFAULT_MIN_SILENCE_DURATION,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            smart_scene_threshold: DEFAULT_SMART_SCENE_THRESHOLD,
            smart_min_scene_marks: 3,
            smart_min_silences: 2,
        }
    }
}

impl DetectionConfig {
    /// Builder-style setter for the scene threshold.
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the silence noise floor.
    pub fn with_silence_threshold_db(mut self, db: f64) -> Self {
        self.silence_threshold_db = db;
        self
    }

    /// Builder-style setter for the minimum silence duration.
    pub fn with_min_silence_duration(mut self, secs: f64) -> Self {
        self.min_silence_duration = secs.max(0.0);
        self
    }
}
