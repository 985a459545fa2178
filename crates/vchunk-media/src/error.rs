//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use vchunk_models::TransformPolicy;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing, scanning or materializing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Cannot apply {policy} transform to {src_w}x{src_h} source for {out_w}x{out_h} output: {reason}")]
    InvalidGeometry {
        policy: TransformPolicy,
        src_w: u32,
        src_h: u32,
        out_w: u32,
        out_h: u32,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(
        policy: TransformPolicy,
        (src_w, src_h): (u32, u32),
        (out_w, out_h): (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidGeometry {
            policy,
            src_w,
            src_h,
            out_w,
            out_h,
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
