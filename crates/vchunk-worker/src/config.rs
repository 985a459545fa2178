//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;

use tokio::sync::Semaphore;
use vchunk_media::RenderOptions;
use vchunk_models::{
    DetectionConfig, EncodingConfig, OutputFormat, PlannerConfig, SplitStrategy, TransformPolicy,
};

use crate::error::{WorkerError, WorkerResult};

/// Default number of chunks materialized at once per file.
pub const DEFAULT_MAX_WORKERS: usize = 4;
/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Processed_Output";

/// Worker configuration.
///
/// Built once at startup and passed by value into the processor.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Target chunk length and search window
    pub planner: PlannerConfig,
    /// Silence and scene detection thresholds
    pub detection: DetectionConfig,
    /// Requested split strategy
    pub strategy: SplitStrategy,
    /// Vertical-format policy and output size
    pub format: OutputFormat,
    /// Codec settings for transcoded chunks
    pub encoding: EncodingConfig,
    /// Blur strength for the blur composite
    pub render: RenderOptions,
    /// Maximum concurrent chunk materializations per file
    pub max_workers: usize,
    /// Where chunks are written
    pub output_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            detection: DetectionConfig::default(),
            strategy: SplitStrategy::default(),
            format: OutputFormat::default(),
            encoding: EncodingConfig::default(),
            render: RenderOptions::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        let planner = PlannerConfig::new(
            parsed("CHUNKER_TARGET_DURATION").unwrap_or(defaults.planner.target_duration),
            parsed("CHUNKER_SEARCH_WINDOW").unwrap_or(defaults.planner.search_window),
        );

        let mut detection = defaults
            .detection
            .with_silence_threshold_db(
                parsed("CHUNKER_SILENCE_THRESHOLD_DB").unwrap_or(defaults.detection.silence_threshold_db),
            )
            .with_min_silence_duration(
                parsed("CHUNKER_MIN_SILENCE").unwrap_or(defaults.detection.min_silence_duration),
            )
            .with_scene_threshold(
                parsed("CHUNKER_SCENE_THRESHOLD").unwrap_or(defaults.detection.scene_threshold),
            );
        if let Some(threshold) = parsed("CHUNKER_SMART_SCENE_THRESHOLD") {
            detection.smart_scene_threshold = threshold.clamp(0.0, 1.0);
        }

        let format = OutputFormat::new(
            parse_or(lookup("CHUNKER_FORMAT"), TransformPolicy::default()),
            parse_or(lookup("CHUNKER_OUTPUT_WIDTH"), defaults.format.width),
            parse_or(lookup("CHUNKER_OUTPUT_HEIGHT"), defaults.format.height),
        );

        let mut encoding = defaults
            .encoding
            .with_force_transcode(lookup("CHUNKER_RE_ENCODE").map(|v| is_truthy(&v)).unwrap_or(false));
        if let Some(secs) = parsed("CHUNKER_FADE_OUT_SECS").filter(|s| *s > 0.0) {
            encoding = encoding.with_fade_out(secs);
        }
        if let Some(crf) = lookup("CHUNKER_CRF").and_then(|s| s.trim().parse::<u8>().ok()) {
            encoding = encoding.with_crf(crf);
        }

        let render = RenderOptions {
            blur_sigma: parse_or(lookup("CHUNKER_BLUR_SIGMA"), defaults.render.blur_sigma),
        };

        Self {
            planner,
            detection,
            strategy: parse_or(lookup("CHUNKER_STRATEGY"), defaults.strategy),
            format,
            encoding,
            render,
            max_workers: parse_or(lookup("CHUNKER_MAX_WORKERS"), defaults.max_workers),
            output_dir: lookup("CHUNKER_OUTPUT_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }

    /// Reject configurations no file could be processed with.
    pub fn validate(&self) -> WorkerResult<()> {
        self.planner
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;

        if self.max_workers == 0 || self.max_workers > Semaphore::MAX_PERMITS {
            return Err(WorkerError::config_error(format!(
                "max_workers must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_workers
            )));
        }
        if self.format.width == 0 || self.format.height == 0 {
            return Err(WorkerError::config_error(format!(
                "output size must be non-zero, got {}x{}",
                self.format.width, self.format.height
            )));
        }
        if !self.detection.min_silence_duration.is_finite() {
            return Err(WorkerError::config_error("min_silence_duration must be finite"));
        }
        if !self.render.blur_sigma.is_finite() || self.render.blur_sigma <= 0.0 {
            return Err(WorkerError::config_error(format!(
                "blur_sigma must be positive, got {}",
                self.render.blur_sigma
            )));
        }
        if let Some(secs) = self.encoding.fade_out_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(WorkerError::config_error(format!(
                    "fade_out_secs must be positive, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
