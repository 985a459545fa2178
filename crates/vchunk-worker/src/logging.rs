//! Structured per-file logging.
//!
//! Every line carries the file being processed and the stage it is in, so a
//! run over a directory can be filtered down to one input.

use std::path::Path;

use tracing::{error, info, warn, Span};

/// Logger bound to one input file and one processing stage.
#[derive(Debug, Clone)]
pub struct FileLogger {
    file: String,
    stage: String,
}

impl FileLogger {
    /// Create a logger for `path` in `stage` (e.g. "planning", "chunking").
    pub fn new(path: &Path, stage: &str) -> Self {
        Self {
            file: path.display().to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same file, different stage.
    pub fn with_stage(&self, stage: &str) -> Self {
        Self {
            file: self.file.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "File started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "File progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(file = %self.file, stage = %self.stage, "File warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(file = %self.file, stage = %self.stage, "File error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(file = %self.file, stage = %self.stage, "File completed: {}", message);
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span covering all work on this file.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("file", file = %self.file, stage = %self.stage)
    }
}
