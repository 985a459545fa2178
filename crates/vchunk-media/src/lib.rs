//! Media side of the chunker.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a process runner
//! - Progress parsing from `-progress pipe:2`
//! - Video probing through ffprobe
//! - Silence and scene-change detection
//! - Cut-point planning for every split strategy
//! - Vertical-format transforms and their filter graphs
//! - The [`MediaBackend`] seam that the worker drives

pub mod backend;
pub mod command;
pub mod detection;
pub mod error;
pub mod filters;
pub mod probe;
pub mod progress;
pub mod segmentation;

pub use backend::{FfmpegBackend, MaterializeRequest, MediaBackend};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use detection::{detect_scenes, detect_silence, parse_scene_events, parse_silence_events};
pub use error::{MediaError, MediaResult};
pub use filters::{build_transform, video_filter_graph, FadeOut, RenderOptions};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use segmentation::{resolve_strategy, PlanningSignals, ResolvedPlan, Segmenter, SmartRule};
