//! vchunk binary.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vchunk_media::{check_ffmpeg, check_ffprobe, FfmpegBackend};
use vchunk_worker::{ChunkProcessor, Cli, FileOutcome, RunSummary, WorkerConfig};

/// Exit status when the run finished but some files or chunks failed.
const PARTIAL_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(PARTIAL_FAILURE),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Colored output for terminals, JSON when `LOG_FORMAT=json`.
fn init_tracing(verbose: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_directive = if verbose { "vchunk=debug" } else { "vchunk=info" };
    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = default_directive.parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    info!("Starting vchunk");

    let config = cli.apply(WorkerConfig::from_env());
    config.validate().context("invalid configuration")?;
    info!("Chunker config: {:?}", config);

    let ffmpeg = check_ffmpeg().context("ffmpeg is required")?;
    let ffprobe = check_ffprobe().context("ffprobe is required")?;
    info!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Media tools found");

    let mut backend =
        FfmpegBackend::new(config.encoding.clone()).with_render_options(config.render);
    if let Some(secs) = cli.ffmpeg_timeout {
        backend = backend.with_timeout(secs);
    }

    let processor = ChunkProcessor::new(config, Arc::new(backend))?;
    let summary = processor
        .process_directory(&cli.input)
        .await
        .with_context(|| format!("failed to process {}", cli.input.display()))?;

    for outcome in &summary.files {
        match outcome {
            FileOutcome::Processed(report) => info!(
                file = %report.source.display(),
                strategy = %report.strategy,
                chunks = report.execution.total(),
                failed = report.execution.failed(),
                "File summary"
            ),
            FileOutcome::Failed { source, error } => warn!(
                file = %source.display(),
                error = %error,
                "File skipped"
            ),
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(summary)
}
