use super::orchestrator::BatchOrchestrator;
use crate::config::AppConfig;
use crate::domain::{BatchResult, RenditionSpec};
use crate::ports::engine::MediaEngine;
use crate::ports::storage::MediaStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Controls a running [`Scheduler`] from elsewhere (HTTP handlers, signal
/// handling).
#[derive(Clone)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

impl SchedulerHandle {
    /// Start a sweep now instead of waiting out the interval. A trigger that
    /// arrives mid-sweep runs one more sweep right after it.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Stop the loop. The sweep in progress stops taking new items; items
    /// already started run to completion.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Runs a sweep, sleeps, and repeats until shut down.
pub struct Scheduler<S, E> {
    orchestrator: Arc<BatchOrchestrator<S, E>>,
    qualities: Arc<[RenditionSpec]>,
    interval: Duration,
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

impl<S, E> Scheduler<S, E>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    pub fn new(orchestrator: Arc<BatchOrchestrator<S, E>>, config: &AppConfig) -> Self {
        Self {
            orchestrator,
            qualities: config.qualities.clone(),
            interval: config.sweep_interval,
            cancel: CancellationToken::new(),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            cancel: self.cancel.clone(),
            wake: self.wake.clone(),
        }
    }

    /// Run exactly one sweep in its own task. Discovery failures and panics
    /// are logged and end the sweep, never the scheduler.
    pub async fn tick(&self) -> Option<BatchResult> {
        let orchestrator = self.orchestrator.clone();
        let qualities = self.qualities.clone();
        let cancel = self.cancel.child_token();

        let sweep =
            tokio::spawn(async move { orchestrator.run_sweep(qualities, &cancel).await });

        match sweep.await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                error!("Sweep aborted: {}", e);
                None
            }
            Err(e) => {
                error!("Sweep task failed: {}", e);
                None
            }
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        while !self.cancel.is_cancelled() {
            self.tick().await;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.wake.notified() => debug!("Sweep triggered"),
            }
        }
        info!("Scheduler stopped");
    }
}
