//! Command-line arguments for the `vchunk` binary.

use std::path::PathBuf;

use clap::Parser;

use vchunk_models::{SplitStrategy, TransformPolicy};

use crate::config::WorkerConfig;

/// Split long videos into shorter chunks at natural boundaries.
///
/// Every option falls back to its `CHUNKER_*` environment variable, then to
/// the built-in default.
#[derive(Debug, Parser)]
#[command(name = "vchunk")]
#[command(author, version, about)]
pub struct Cli {
    /// Directory containing the videos to chunk (mp4, mkv, avi)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory the chunks are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target chunk duration in seconds
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Allowed deviation from the target, in seconds
    #[arg(short, long)]
    pub window: Option<f64>,

    /// Split strategy: fixed, silence, scene or smart
    #[arg(short, long)]
    pub strategy: Option<SplitStrategy>,

    /// Vertical format: none, crop, pad or blur
    #[arg(short, long)]
    pub format: Option<TransformPolicy>,

    /// Output width for vertical formats
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height for vertical formats
    #[arg(long)]
    pub height: Option<u32>,

    /// Chunks materialized concurrently per file
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Re-encode every chunk instead of stream copying
    #[arg(long)]
    pub re_encode: bool,

    /// Fade out over this many seconds at the end of each re-encoded chunk
    #[arg(long)]
    pub fade_out: Option<f64>,

    /// Silence noise floor in dB
    #[arg(long, allow_hyphen_values = true)]
    pub silence_db: Option<f64>,

    /// Minimum silence length in seconds
    #[arg(long)]
    pub min_silence: Option<f64>,

    /// Scene-change threshold (0.0 - 1.0)
    #[arg(long)]
    pub scene_threshold: Option<f64>,

    /// Kill any single FFmpeg invocation after this many seconds
    #[arg(long)]
    pub ffmpeg_timeout: Option<u64>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Overlay the explicitly given arguments on `config`.
    pub fn apply(&self, mut config: WorkerConfig) -> WorkerConfig {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(duration) = self.duration {
            config.planner.target_duration = duration;
        }
        if let Some(window) = self.window {
            config.planner.search_window = window;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(policy) = self.format {
            config.format.policy = policy;
        }
        if let Some(width) = self.width {
            config.format.width = width;
        }
        if let Some(height) = self.height {
            config.format.height = height;
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if self.re_encode {
            config.encoding = config.encoding.with_force_transcode(true);
        }
        if let Some(secs) = self.fade_out {
            config.encoding = config.encoding.with_fade_out(secs);
        }
        if let Some(db) = self.silence_db {
            config.detection = config.detection.with_silence_threshold_db(db);
        }
        if let Some(secs) = self.min_silence {
            config.detection = config.detection.with_min_silence_duration(secs);
        }
        if let Some(threshold) = self.scene_threshold {
            config.detection = config.detection.with_scene_threshold(threshold);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_arguments_keep_config() {
        let cli = Cli::try_parse_from(["vchunk", "videos"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("videos"));

        let config = cli.apply(WorkerConfig::default());
        assert_eq!(config.planner.target_duration, 120.0);
        assert_eq!(config.strategy, SplitStrategy::Silence);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn test_arguments_override_config() {
        let cli = Cli::try_parse_from([
            "vchunk",
            "videos",
            "-o",
            "out",
            "-d",
            "90",
            "--strategy",
            "auto",
            "--format",
            "crop",
            "-j",
            "2",
            "--re-encode",
            "--silence-db",
            "-45",
        ])
        .unwrap();

        let config = cli.apply(WorkerConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.planner.target_duration, 90.0);
        assert_eq!(config.strategy, SplitStrategy::Smart);
        assert_eq!(config.format.policy, TransformPolicy::Crop);
        assert_eq!(config.max_workers, 2);
        assert!(config.encoding.force_transcode);
        assert_eq!(config.detection.silence_threshold_db, -45.0);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(Cli::try_parse_from(["vchunk", "videos", "--strategy", "random"]).is_err());
        assert!(Cli::try_parse_from(["vchunk"]).is_err());
    }
}
