use super::pipeline::ItemPipeline;
use crate::config::AppConfig;
use crate::domain::keys::{published_video_id, SOURCE_PREFIX, TRANSCODED_PREFIX};
use crate::domain::{BatchResult, FailureKind, PipelineOutcome, RenditionSpec, SourceVideoRef};
use crate::ports::engine::MediaEngine;
use crate::ports::storage::{MediaStore, StoreError};
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to list pending videos: {0}")]
    Discovery(#[source] StoreError),
}

type WorkQueue = Arc<Mutex<VecDeque<SourceVideoRef>>>;

/// Runs one sweep: discover pending sources, fan them out to a fixed pool of
/// workers, and fold the outcomes into a [`BatchResult`].
pub struct BatchOrchestrator<S, E> {
    store: Arc<S>,
    pipeline: Arc<ItemPipeline<S, E>>,
    config: Arc<AppConfig>,
}

impl<S, E> BatchOrchestrator<S, E>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    pub fn new(store: Arc<S>, engine: Arc<E>, config: Arc<AppConfig>) -> Self {
        let pipeline = Arc::new(ItemPipeline::new(store.clone(), engine, config.clone()));
        Self {
            store,
            pipeline,
            config,
        }
    }

    /// Shared with the HTTP layer for on-demand processing.
    pub fn pipeline(&self) -> Arc<ItemPipeline<S, E>> {
        self.pipeline.clone()
    }

    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Sources under `videos/`, in key order, one per video id.
    pub async fn discover(&self) -> Result<Vec<SourceVideoRef>, SweepError> {
        let keys = self
            .store
            .list(SOURCE_PREFIX)
            .await
            .map_err(SweepError::Discovery)?;

        let published: HashSet<String> = if self.config.skip_published {
            self.store
                .list(TRANSCODED_PREFIX)
                .await
                .map_err(SweepError::Discovery)?
                .iter()
                .filter_map(|key| published_video_id(key))
                .map(str::to_string)
                .collect()
        } else {
            HashSet::new()
        };

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for key in keys {
            let Some(item) = SourceVideoRef::from_key(&key) else {
                debug!(key = %key, "Skipping key without a video id");
                continue;
            };
            if published.contains(&item.video_id) {
                debug!(key = %key, video_id = %item.video_id, "Already published");
                continue;
            }
            if !seen.insert(item.video_id.clone()) {
                warn!(
                    key = %key,
                    video_id = %item.video_id,
                    "Duplicate video id, keeping first source"
                );
                continue;
            }
            items.push(item);
        }
        Ok(items)
    }

    /// Process every pending source once. Only a failed discovery is an error;
    /// item failures are counted in the result.
    pub async fn run_sweep(
        &self,
        qualities: Arc<[RenditionSpec]>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, SweepError> {
        let items = self.discover().await?;
        if items.is_empty() {
            debug!("No pending videos");
            let result = BatchResult::default();
            log_summary(&result);
            return Ok(result);
        }

        let discovered = items.len();
        let workers = self.config.workers.clamp(1, discovered);
        info!(discovered, workers, "Starting sweep");

        let queue: WorkQueue = Arc::new(Mutex::new(items.into()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(run_worker(
                worker,
                queue.clone(),
                self.pipeline.clone(),
                qualities.clone(),
                cancel.clone(),
                tx.clone(),
            ));
        }
        drop(tx);

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("Sweep worker died: {}", e);
            }
        }

        let mut result = BatchResult::default();
        while let Some(outcome) = rx.recv().await {
            if let Some(failure) = &outcome.failure {
                warn!(
                    video_id = %outcome.video_id,
                    key = %outcome.key,
                    kind = %failure.kind,
                    "Video failed: {}",
                    failure.message
                );
            }
            result.record(&outcome);
        }
        result.abandoned = queue.lock().await.len();

        log_summary(&result);
        Ok(result)
    }
}

fn log_summary(result: &BatchResult) {
    info!(
        attempted = result.attempted,
        succeeded = result.succeeded,
        failed = result.failed,
        abandoned = result.abandoned,
        "Sweep finished"
    );
}

async fn run_worker<S, E>(
    worker: usize,
    queue: WorkQueue,
    pipeline: Arc<ItemPipeline<S, E>>,
    qualities: Arc<[RenditionSpec]>,
    cancel: CancellationToken,
    results: mpsc::UnboundedSender<PipelineOutcome>,
) where
    S: MediaStore,
    E: MediaEngine,
{
    debug!(worker, "Worker started");
    loop {
        if cancel.is_cancelled() {
            debug!(worker, "Cancelled, leaving remaining items");
            break;
        }
        let next = queue.lock().await.pop_front();
        let Some(item) = next else {
            break;
        };

        debug!(worker, video_id = %item.video_id, "Processing");
        let outcome = AssertUnwindSafe(pipeline.process(&item, &qualities))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                PipelineOutcome::failed(&item, FailureKind::Panicked, panic_message(&*panic))
            });

        if results.send(outcome).is_err() {
            break;
        }
    }
    debug!(worker, "Worker done");
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("pipeline panicked")
    }
}
