//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output target (a path, or `-` for the null muxer)
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
    /// Whether to emit `-progress pipe:2`
    progress: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
            progress: true,
        }
    }

    /// Command that decodes `input` for analysis and discards the result.
    ///
    /// Filters that report through the log (silencedetect, showinfo) need
    /// the `info` level, and progress blocks would only add noise.
    pub fn analysis(input: impl AsRef<Path>) -> Self {
        Self::new(input, "-")
            .log_level("info")
            .without_progress()
            .output_arg("-f")
            .output_arg("null")
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Drop all audio streams.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Drop all video streams.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Copy every stream without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Do not ask FFmpeg for progress blocks.
    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string(), "-nostdin".to_string()];

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        if self.progress {
            args.push("-progress".to_string());
            args.push("pipe:2".to_string());
            args.push("-nostats".to_string());
        }

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Kill the process if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let mut current = FfmpegProgress::default();
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

        let filter = move |line: String| {
            if let Some(progress) = current.ingest_line(&line) {
                progress_callback(progress);
                return None;
            }
            if line.contains('=') && !line.contains(' ') {
                // Remaining progress keys (fps, bitrate, ...)
                return None;
            }
            Some(line)
        };

        let status = self
            .spawn_and_drain(cmd, filter, &mut tail, STDERR_TAIL_LINES)
            .await?;

        check_status(status, tail)
    }

    /// Run an analysis command and return everything it wrote to stderr.
    ///
    /// Detection filters report their events through the FFmpeg log, so the
    /// log is the payload here.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<String> {
        let mut lines = VecDeque::new();
        let status = self
            .spawn_and_drain(cmd, Some, &mut lines, usize::MAX)
            .await?;

        if !status.success() {
            let tail: VecDeque<String> = lines
                .iter()
                .skip(lines.len().saturating_sub(STDERR_TAIL_LINES))
                .cloned()
                .collect();
            return check_status(status, tail).map(|_| String::new());
        }

        Ok(Vec::from(lines).join("\n"))
    }

    /// Spawn FFmpeg, feed every stderr line through `filter` and keep up to
    /// `keep` of the lines it returns.
    async fn spawn_and_drain<F>(
        &self,
        cmd: &FfmpegCommand,
        mut filter: F,
        kept: &mut VecDeque<String>,
        keep: usize,
    ) -> MediaResult<ExitStatus>
    where
        F: FnMut(String) -> Option<String> + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let reader_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut collected = VecDeque::new();
            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(line) = filter(line) {
                    if collected.len() == keep {
                        collected.pop_front();
                    }
                    collected.push_back(line);
                }
            }
            collected
        });

        let status = self.wait_for_completion(&mut child).await;

        match reader_handle.await {
            Ok(collected) => *kept = collected,
            Err(e) => warn!("FFmpeg stderr reader failed: {}", e),
        }

        status
    }

    /// Wait for the child process, enforcing the optional timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    let _ = child.kill().await;
                    Err(MediaError::Timeout(secs))
                }
            },
            None => Ok(child.wait().await?),
        }
    }
}

fn check_status(status: ExitStatus, stderr_tail: VecDeque<String>) -> MediaResult<()> {
    if status.success() {
        return Ok(());
    }
    let stderr = (!stderr_tail.is_empty()).then(|| Vec::from(stderr_tail).join("\n"));
    Err(MediaError::ffmpeg_failed(
        "FFmpeg exited with non-zero status",
        stderr,
        status.code(),
    ))
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
