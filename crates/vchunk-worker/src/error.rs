//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Invalid video: {0}")]
    InvalidVideo(String),

    #[error("Media error: {0}")]
    Media(#[from] vchunk_media::MediaError),

    #[error("Planning error: {0}")]
    Plan(#[from] vchunk_models::PlanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_video(msg: impl Into<String>) -> Self {
        Self::InvalidVideo(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vchunk_media::MediaError;
    use vchunk_models::{PlanError, TransformPolicy};

    #[test]
    fn test_conversions() {
        let geometry: WorkerError = MediaError::invalid_geometry(
            TransformPolicy::Crop,
            (600, 1080),
            (1080, 1920),
            "too narrow",
        )
        .into();
        assert!(matches!(geometry, WorkerError::Media(MediaError::InvalidGeometry { .. })));
        assert!(geometry.to_string().contains("crop"));

        let plan: WorkerError = PlanError::InvalidTargetDuration(0.0).into();
        assert!(matches!(plan, WorkerError::Plan(_)));
        assert_eq!(
            WorkerError::config_error("zero workers").to_string(),
            "Configuration error: zero workers"
        );
    }
}
