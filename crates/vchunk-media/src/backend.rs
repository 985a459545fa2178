//! Media backend abstraction.
//!
//! The planner and executor only ever talk to a [`MediaBackend`]. The
//! shipped implementation, [`FfmpegBackend`], drives the `ffmpeg` and
//! `ffprobe` CLIs; tests substitute in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, trace};

use vchunk_models::{ChunkRange, CodecPolicy, EncodingConfig, TransformDescriptor};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{video_filter_graph, FadeOut, RenderOptions, VIDEO_OUT_LABEL};
use crate::probe::{probe_video, VideoInfo};

/// Everything needed to write one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    pub source: PathBuf,
    pub range: ChunkRange,
    pub transform: Option<TransformDescriptor>,
    pub output: PathBuf,
    pub codec: CodecPolicy,
}

impl MaterializeRequest {
    /// Reject requests that cannot be honored, such as a geometry change
    /// under stream copy.
    pub fn validate(&self) -> MediaResult<()> {
        if self.transform.is_some() && self.codec == CodecPolicy::Copy {
            return Err(MediaError::internal(
                "a transformed chunk cannot be produced by stream copy",
            ));
        }
        if !(self.range.end > self.range.start) {
            return Err(MediaError::internal(format!(
                "empty chunk range {:.3}..{:.3}",
                self.range.start, self.range.end
            )));
        }
        Ok(())
    }
}

/// Operations the chunker needs from a media engine.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Duration and geometry of `source`.
    async fn probe(&self, source: &Path) -> MediaResult<VideoInfo>;

    /// Raw silence event log for `source`.
    async fn scan_silence(&self, source: &Path, threshold_db: f64, min_duration: f64) -> MediaResult<String>;

    /// Raw scene-change event log for `source`.
    async fn scan_scenes(&self, source: &Path, threshold: f64) -> MediaResult<String>;

    /// Write `request.range` of `request.source` to `request.output`.
    async fn materialize(&self, request: &MaterializeRequest) -> MediaResult<()>;
}

/// [`MediaBackend`] backed by the FFmpeg command-line tools.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    encoding: EncodingConfig,
    render: RenderOptions,
    runner: FfmpegRunner,
}

impl FfmpegBackend {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            render: RenderOptions::default(),
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// Kill any single FFmpeg invocation after `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Build the FFmpeg invocation for one chunk.
    pub fn chunk_command(&self, request: &MaterializeRequest) -> FfmpegCommand {
        let duration = request.range.duration();
        let cmd = FfmpegCommand::new(&request.source, &request.output)
            .seek(request.range.start)
            .duration(duration);

        match request.codec {
            CodecPolicy::Copy => cmd
                .map("0")
                .codec_copy()
                .output_args(["-avoid_negative_ts", "make_zero"]),
            CodecPolicy::Transcode => {
                let fade = self
                    .encoding
                    .fade_out_secs
                    .and_then(|secs| FadeOut::at_tail(duration, secs));

                let mut cmd = match video_filter_graph(request.transform.as_ref(), &self.render, fade) {
                    Some(graph) => cmd.filter_complex(graph).map(VIDEO_OUT_LABEL),
                    None => cmd.map("0:v:0"),
                };
                cmd = cmd.map("0:a?");
                if let Some(fade) = fade {
                    cmd = cmd.audio_filter(fade.audio_filter());
                }

                cmd.video_codec(&self.encoding.codec)
                    .preset(&self.encoding.preset)
                    .crf(self.encoding.crf)
                    .audio_codec(&self.encoding.audio_codec)
                    .audio_bitrate(&self.encoding.audio_bitrate)
                    .output_args(["-movflags", "+faststart"])
            }
        }
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe(&self, source: &Path) -> MediaResult<VideoInfo> {
        probe_video(source).await
    }

    async fn scan_silence(&self, source: &Path, threshold_db: f64, min_duration: f64) -> MediaResult<String> {
        let cmd = FfmpegCommand::analysis(source)
            .audio_filter(format!("silencedetect=noise={}dB:d={}", threshold_db, min_duration))
            .no_video();
        self.runner.run_capture(&cmd).await
    }

    async fn scan_scenes(&self, source: &Path, threshold: f64) -> MediaResult<String> {
        let cmd = FfmpegCommand::analysis(source)
            .video_filter(format!("select='gt(scene,{})',showinfo", threshold))
            .no_audio();
        self.runner.run_capture(&cmd).await
    }

    async fn materialize(&self, request: &MaterializeRequest) -> MediaResult<()> {
        request.validate()?;

        info!(
            source = %request.source.display(),
            output = %request.output.display(),
            start = request.range.start,
            end = request.range.end,
            codec = ?request.codec,
            size = ?request.transform.map(|t| t.output_size()),
            "Materializing chunk"
        );

        let cmd = self.chunk_command(request);
        let expected_ms = (request.range.duration() * 1000.0) as i64;
        let output = request.output.display().to_string();

        self.runner
            .run_with_progress(&cmd, move |progress| {
                trace!(
                    output = %output,
                    percent = progress.percentage(expected_ms),
                    speed = progress.speed,
                    "Chunk progress"
                );
            })
            .await?;

        debug!(output = %request.output.display(), "Chunk written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vchunk_models::TransformPolicy;

    use crate::filters::build_transform;

    fn request(codec: CodecPolicy, transform: Option<TransformDescriptor>) -> MaterializeRequest {
        MaterializeRequest {
            source: PathBuf::from("in.mkv"),
            range: ChunkRange { start: 115.5, end: 236.0 },
            transform,
            output: PathBuf::from("out/Show_S01E02_Part002.mp4"),
            codec,
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_copy_command() {
        let backend = FfmpegBackend::default();
        let args = backend.chunk_command(&request(CodecPolicy::Copy, None)).build_args();

        assert!(has_pair(&args, "-ss", "115.500"));
        assert!(has_pair(&args, "-t", "120.500"));
        assert!(has_pair(&args, "-c", "copy"));
        assert!(!args.contains(&"-filter_complex".to_string()));
        assert_eq!(args.last().unwrap(), "out/Show_S01E02_Part002.mp4");
    }

    #[test]
    fn test_transcode_with_crop() {
        let transform = build_transform(TransformPolicy::Crop, 1920, 1080, 1080, 1920).unwrap();
        let backend = FfmpegBackend::default();
        let args = backend
            .chunk_command(&request(CodecPolicy::Transcode, transform))
            .build_args();

        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(has_pair(&args, "-map", "[vout]"));
        assert!(has_pair(&args, "-map", "0:a?"));
        assert!(has_pair(&args, "-c:v", "libx264"));
        assert!(!has_pair(&args, "-c", "copy"));
    }

    #[test]
    fn test_transcode_with_fade() {
        let backend = FfmpegBackend::new(EncodingConfig::default().with_fade_out(1.0));
        let args = backend
            .chunk_command(&request(CodecPolicy::Transcode, None))
            .build_args();

        let graph_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[graph_pos + 1].contains("fade=t=out:st=119.500:d=1.000"));
        assert!(has_pair(&args, "-af", "afade=t=out:st=119.500:d=1.000"));
    }

    #[test]
    fn test_plain_transcode_maps_source_video() {
        let backend = FfmpegBackend::default();
        let args = backend
            .chunk_command(&request(CodecPolicy::Transcode, None))
            .build_args();
        assert!(has_pair(&args, "-map", "0:v:0"));
        assert!(!args.contains(&"-filter_complex".to_string()));
    }

    #[test]
    fn test_copy_with_transform_is_rejected() {
        let transform = build_transform(TransformPolicy::Pad, 1920, 1080, 1080, 1920).unwrap();
        assert!(request(CodecPolicy::Copy, transform).validate().is_err());
        assert!(request(CodecPolicy::Transcode, transform).validate().is_ok());
    }
}
