//! Chunking worker.
//!
//! This crate provides:
//! - The bounded chunk executor with per-chunk failure isolation
//! - Per-file orchestration over an input directory
//! - Episode metadata parsing and chunk naming
//! - Environment and command-line configuration
//! - Structured per-file logging

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod naming;
pub mod processor;

pub use cli::Cli;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{run_bounded, ChunkExecutor, ChunkProgress, ExecutionReport, TaskError};
pub use logging::FileLogger;
pub use naming::ShowInfo;
pub use processor::{scan_inputs, ChunkProcessor, FileOutcome, FileReport, RunSummary};
