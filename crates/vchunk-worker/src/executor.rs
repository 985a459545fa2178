//! Bounded chunk executor.
//!
//! Every chunk of a file is materialized by its own task; a semaphore keeps
//! at most `max_workers` of them inside the backend at once. A chunk that
//! errors or panics becomes a [`ChunkOutcome::Failed`] and its siblings keep
//! running. Nothing is retried.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use vchunk_media::{MaterializeRequest, MediaBackend};
use vchunk_models::{ChunkOutcome, ChunkSpec, CodecPolicy, TransformDescriptor};

/// Why a bounded task produced no result.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("worker pool closed before the task started")]
    PoolClosed,

    #[error("task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run `task` over `items` with at most `limit` futures in flight.
///
/// `limit` is clamped to `1..=Semaphore::MAX_PERMITS`. Each item runs on its
/// own tokio task, so a panic is contained to that item's slot. Results come
/// back in input order.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, task: F) -> Vec<Result<R, TaskError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)));
    run_with_semaphore(semaphore, items, task).await
}

async fn run_with_semaphore<T, R, F, Fut>(
    semaphore: Arc<Semaphore>,
    items: Vec<T>,
    task: F,
) -> Vec<Result<R, TaskError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let fut = task(item);
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(TaskError::PoolClosed);
                };
                Ok(fut.await)
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.map_err(TaskError::from).and_then(|result| result))
        .collect()
}

/// Aggregate chunk progress for the file being executed.
///
/// `pending = total - running - completed - failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkProgress {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ChunkProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn pending(&self) -> usize {
        self.total
            .saturating_sub(self.running + self.completed + self.failed)
    }

    pub fn is_finished(&self) -> bool {
        self.completed + self.failed == self.total
    }
}

/// Outcomes of one execute call, in no particular order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<ChunkOutcome>,
}

impl ExecutionReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.completed()
    }

    /// `(index, cause)` for every failed chunk.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            ChunkOutcome::Failed { index, cause } => Some((*index, cause.as_str())),
            ChunkOutcome::Completed { .. } => None,
        })
    }

    /// Outputs of the completed chunks, sorted by chunk index.
    pub fn outputs(&self) -> Vec<PathBuf> {
        let mut completed: Vec<(usize, &PathBuf)> = self
            .outcomes
            .iter()
            .filter_map(|o| match o {
                ChunkOutcome::Completed { index, output } => Some((*index, output)),
                ChunkOutcome::Failed { .. } => None,
            })
            .collect();
        completed.sort_by_key(|(index, _)| *index);
        completed.into_iter().map(|(_, output)| output.clone()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Dispatches chunk specs to a [`MediaBackend`] under a worker budget.
pub struct ChunkExecutor {
    backend: Arc<dyn MediaBackend>,
    max_workers: usize,
    force_transcode: bool,
    progress: Arc<watch::Sender<ChunkProgress>>,
}

impl ChunkExecutor {
    pub fn new(backend: Arc<dyn MediaBackend>, max_workers: usize) -> Self {
        let (progress, _) = watch::channel(ChunkProgress::default());
        Self {
            backend,
            max_workers: max_workers.max(1),
            force_transcode: false,
            progress: Arc::new(progress),
        }
    }

    /// Re-encode even chunks without a transform.
    pub fn with_force_transcode(mut self, force: bool) -> Self {
        self.force_transcode = force;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Watch progress of the current (or last) execute call.
    pub fn subscribe(&self) -> watch::Receiver<ChunkProgress> {
        self.progress.subscribe()
    }

    /// Materialize every spec of `source`.
    ///
    /// Always returns one outcome per spec.
    pub async fn execute(
        &self,
        source: &Path,
        specs: Vec<ChunkSpec>,
        transform: Option<TransformDescriptor>,
    ) -> ExecutionReport {
        let codec = CodecPolicy::select(transform.is_some(), self.force_transcode);
        let total = specs.len();
        self.progress.send_replace(ChunkProgress::new(total));

        info!(
            file = %source.display(),
            chunks = total,
            max_workers = self.max_workers,
            codec = ?codec,
            "Dispatching chunks"
        );

        let indices: Vec<usize> = specs.iter().map(|s| s.index).collect();
        let source = source.to_path_buf();

        let results = run_bounded(specs, self.max_workers, |spec| {
            let backend = Arc::clone(&self.backend);
            let progress = Arc::clone(&self.progress);
            let request = MaterializeRequest {
                source: source.clone(),
                range: spec.range,
                transform,
                output: spec.output,
                codec,
            };
            run_chunk(backend, progress, spec.index, request)
        })
        .await;

        let outcomes = results
            .into_iter()
            .zip(indices)
            .map(|(result, index)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    // run_chunk catches panics, so the chunk never started.
                    self.progress.send_modify(|p| p.failed += 1);
                    warn!(chunk_index = index, error = %e, "Chunk not run");
                    ChunkOutcome::Failed {
                        index,
                        cause: e.to_string(),
                    }
                }
            })
            .collect();

        ExecutionReport { outcomes }
    }
}

/// One chunk, from running to a terminal outcome.
async fn run_chunk(
    backend: Arc<dyn MediaBackend>,
    progress: Arc<watch::Sender<ChunkProgress>>,
    index: usize,
    request: MaterializeRequest,
) -> ChunkOutcome {
    progress.send_modify(|p| p.running += 1);
    debug!(chunk_index = index, start = request.range.start, end = request.range.end, "Chunk running");

    let result = AssertUnwindSafe(backend.materialize(&request)).catch_unwind().await;

    let outcome = match result {
        Ok(Ok(())) => ChunkOutcome::Completed {
            index,
            output: request.output,
        },
        Ok(Err(e)) => ChunkOutcome::Failed {
            index,
            cause: e.to_string(),
        },
        Err(payload) => ChunkOutcome::Failed {
            index,
            cause: format!("chunk task panicked: {}", panic_message(payload.as_ref())),
        },
    };

    progress.send_modify(|p| {
        p.running -= 1;
        if outcome.is_completed() {
            p.completed += 1;
        } else {
            p.failed += 1;
        }
    });
    let snapshot = *progress.borrow();

    match &outcome {
        ChunkOutcome::Completed { output, .. } => info!(
            chunk_index = index,
            output = %output.display(),
            completed = snapshot.completed,
            failed = snapshot.failed,
            total = snapshot.total,
            "Chunk completed"
        ),
        ChunkOutcome::Failed { cause, .. } => warn!(
            chunk_index = index,
            cause = %cause,
            completed = snapshot.completed,
            failed = snapshot.failed,
            total = snapshot.total,
            "Chunk failed"
        ),
    }

    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
