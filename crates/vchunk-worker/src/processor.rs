//! Per-file orchestration.
//!
//! Files are processed one after another. For each file: probe, build the
//! transform, resolve the strategy, plan cut points, name the chunks, then
//! hand them to the [`ChunkExecutor`]. A failing file is recorded in the
//! [`RunSummary`] and the run moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use vchunk_media::{build_transform, resolve_strategy, MediaBackend, Segmenter, SmartRule};
use vchunk_models::{ChunkSpec, CutPoints, SplitStrategy, TransformDescriptor};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{ChunkExecutor, ChunkProgress, ExecutionReport};
use crate::logging::FileLogger;
use crate::naming::ShowInfo;

/// Container extensions picked up from the input directory.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "avi"];

/// Result of chunking one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub show: ShowInfo,
    /// Probed duration in seconds
    pub duration: f64,
    /// Strategy actually used (never `smart`)
    pub strategy: SplitStrategy,
    pub cut_points: CutPoints,
    pub transform: Option<TransformDescriptor>,
    pub execution: ExecutionReport,
}

/// Terminal state of one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed(FileReport),
    Failed { source: PathBuf, error: String },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Processed(report) => &report.source,
            FileOutcome::Failed { source, .. } => source,
        }
    }
}

/// Everything that happened during one directory run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn files_processed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Processed(_)))
            .count()
    }

    pub fn files_failed(&self) -> usize {
        self.files.len() - self.files_processed()
    }

    pub fn chunks_completed(&self) -> usize {
        self.reports().map(|r| r.execution.completed()).sum()
    }

    pub fn chunks_failed(&self) -> usize {
        self.reports().map(|r| r.execution.failed()).sum()
    }

    /// No file-level and no chunk-level failures.
    pub fn is_success(&self) -> bool {
        self.files_failed() == 0 && self.chunks_failed() == 0
    }

    fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter_map(|f| match f {
            FileOutcome::Processed(report) => Some(report),
            FileOutcome::Failed { .. } => None,
        })
    }
}

/// List chunkable videos directly inside `dir`, sorted by path.
pub async fn scan_inputs(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut inputs = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if has_video_extension(&path) {
            inputs.push(path);
        }
    }

    inputs.sort();
    Ok(inputs)
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
        .unwrap_or(false)
}

/// Drives planning and execution for every input file.
pub struct ChunkProcessor {
    config: WorkerConfig,
    backend: Arc<dyn MediaBackend>,
    segmenter: Segmenter,
    executor: ChunkExecutor,
}

impl ChunkProcessor {
    /// Create a processor; fails if `config` does not validate.
    pub fn new(config: WorkerConfig, backend: Arc<dyn MediaBackend>) -> WorkerResult<Self> {
        config.validate()?;

        let segmenter =
            Segmenter::new(config.planner).with_smart_rule(SmartRule::from(&config.detection));
        let executor = ChunkExecutor::new(Arc::clone(&backend), config.max_workers)
            .with_force_transcode(config.encoding.force_transcode);

        Ok(Self {
            config,
            backend,
            segmenter,
            executor,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Chunk progress of the file currently executing.
    pub fn subscribe_progress(&self) -> watch::Receiver<ChunkProgress> {
        self.executor.subscribe()
    }

    /// Chunk every video in `input_dir`, one file at a time.
    pub async fn process_directory(&self, input_dir: &Path) -> WorkerResult<RunSummary> {
        if !tokio::fs::metadata(input_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(WorkerError::InputNotFound(input_dir.to_path_buf()));
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let inputs = scan_inputs(input_dir).await?;
        if inputs.is_empty() {
            warn!(dir = %input_dir.display(), "No video files found");
            return Ok(RunSummary::default());
        }

        info!(
            dir = %input_dir.display(),
            files = inputs.len(),
            output_dir = %self.config.output_dir.display(),
            strategy = %self.config.strategy,
            format = %self.config.format.policy,
            "Starting run"
        );

        let mut summary = RunSummary::default();
        for (i, path) in inputs.iter().enumerate() {
            info!(file = %path.display(), position = i + 1, files = inputs.len(), "Processing file");

            let outcome = match self.process_file(path).await {
                Ok(report) => FileOutcome::Processed(report),
                Err(e) => {
                    FileLogger::new(path, "file").log_error(&e.to_string());
                    FileOutcome::Failed {
                        source: path.clone(),
                        error: e.to_string(),
                    }
                }
            };
            summary.files.push(outcome);
        }

        info!(
            files_processed = summary.files_processed(),
            files_failed = summary.files_failed(),
            chunks_completed = summary.chunks_completed(),
            chunks_failed = summary.chunks_failed(),
            "Run complete"
        );
        Ok(summary)
    }

    /// Chunk a single file.
    ///
    /// Errors here are file-level: nothing has been dispatched yet when
    /// one is returned. Chunk failures are reported inside the
    /// [`FileReport`] instead.
    pub async fn process_file(&self, path: &Path) -> WorkerResult<FileReport> {
        let logger = FileLogger::new(path, "file");
        let span = logger.create_span();
        self.process_file_inner(path, logger).instrument(span).await
    }

    async fn process_file_inner(&self, path: &Path, logger: FileLogger) -> WorkerResult<FileReport> {
        let config = &self.config;
        config.planner.validate()?;

        let logger = logger.with_stage("probe");
        logger.log_start("probing");
        let info = self.backend.probe(path).await?;
        if !(info.duration.is_finite() && info.duration > 0.0) {
            return Err(WorkerError::invalid_video(format!(
                "{} has no usable duration ({})",
                path.display(),
                info.duration
            )));
        }

        let transform = build_transform(
            config.format.policy,
            info.width,
            info.height,
            config.format.width,
            config.format.height,
        )?;

        let logger = logger.with_stage("planning");
        let resolved = resolve_strategy(
            self.backend.as_ref(),
            path,
            config.strategy,
            &config.detection,
        )
        .await;
        let cut_points = self
            .segmenter
            .plan(info.duration, resolved.strategy, &resolved.signals)?;
        logger.log_progress(&format!(
            "{} chunks planned with {} strategy over {:.3}s",
            cut_points.len(),
            resolved.strategy,
            info.duration
        ));

        let show = ShowInfo::from_path(path);
        let specs = ChunkSpec::from_cut_points(&cut_points, info.duration, |part| {
            show.chunk_path(&config.output_dir, part)
        });

        let logger = logger.with_stage("chunking");
        let execution = self.executor.execute(path, specs, transform).await;
        for (index, cause) in execution.failures() {
            logger.log_warning(&format!("chunk {index} failed: {cause}"));
        }
        logger.log_completion(&format!(
            "{}/{} chunks written",
            execution.completed(),
            execution.total()
        ));

        Ok(FileReport {
            source: path.to_path_buf(),
            show,
            duration: info.duration,
            strategy: resolved.strategy,
            cut_points,
            transform,
            execution,
        })
    }
}
