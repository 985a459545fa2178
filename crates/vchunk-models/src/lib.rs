//! Shared data models for the vchunk video chunker.
//!
//! This crate provides plain, Serde-serializable types for:
//! - Detected events (silence intervals, scene marks)
//! - Split strategies and planner/detection configuration
//! - Cut-point sequences and the chunk specs derived from them
//! - Vertical-format transform policies and descriptors
//! - Encoding configuration and codec policy

pub mod chunk;
pub mod config;
pub mod cut_points;
pub mod encoding;
pub mod signals;
pub mod strategy;
pub mod transform;

// Re-export common types
pub use chunk::{ChunkOutcome, ChunkSpec};
pub use config::{DetectionConfig, PlannerConfig};
pub use cut_points::{ChunkRange, CutPoints, PlanError, MIN_CHUNK_SECS};
pub use encoding::{CodecPolicy, EncodingConfig};
pub use signals::{SceneMark, SilenceInterval};
pub use strategy::{SplitStrategy, StrategyParseError};
pub use transform::{OutputFormat, TransformDescriptor, TransformPolicy, TransformPolicyParseError};
