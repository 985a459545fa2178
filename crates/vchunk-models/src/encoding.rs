//! Encoding configuration for materialized chunks.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// How a chunk's bitstream is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecPolicy {
    /// Copy source packets without re-encoding
    Copy,
    /// Decode and re-encode with the configured codecs
    Transcode,
}

impl CodecPolicy {
    /// Pick the policy for a chunk.
    ///
    /// Any geometry change forces a transcode; otherwise the operator decides.
    pub fn select(has_transform: bool, force_transcode: bool) -> Self {
        if has_transform || force_transcode {
            CodecPolicy::Transcode
        } else {
            CodecPolicy::Copy
        }
    }
}

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Re-encode even when no transform is requested
    #[serde(default)]
    pub force_transcode: bool,

    /// Fade video and audio out over this many seconds at each chunk tail
    /// (transcoded chunks only)
    #[serde(default)]
    pub fade_out_secs: Option<f64>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            force_transcode: false,
            fade_out_secs: None,
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Always re-encode, even for pass-through chunks.
    pub fn with_force_transcode(mut self, force: bool) -> Self {
        self.force_transcode = force;
        self
    }

    /// Fade out over `secs` at the end of each transcoded chunk.
    pub fn with_fade_out(mut self, secs: f64) -> Self {
        self.fade_out_secs = (secs.is_finite() && secs > 0.0).then_some(secs);
        self
    }

    /// Codec policy for a chunk with or without a transform.
    pub fn codec_policy(&self, has_transform: bool) -> CodecPolicy {
        CodecPolicy::select(has_transform, self.force_transcode)
    }
}
