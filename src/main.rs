//! Service binary
//!
//! Wires up:
//! - the object store selected by `STORAGE_BACKEND` (S3 or a local directory)
//! - the ffmpeg engine
//! - the sweep scheduler, running in the background
//! - the on-demand HTTP API

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use hlsweep::adapters::aws::S3Adapter;
use hlsweep::adapters::http::{self, AppState};
use hlsweep::adapters::local::FsAdapter;
use hlsweep::adapters::FfmpegEngine;
use hlsweep::config::{AppConfig, Backend, ConfigError};
use hlsweep::ports::storage::MediaStore;
use hlsweep::{BatchOrchestrator, Scheduler};
use std::error::Error;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match config.backend {
        Backend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or(ConfigError::Missing("S3_BUCKET_NAME"))?;
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = &config.s3_region {
                loader = loader.region(Region::new(region.clone()));
            }
            let sdk_config = loader.load().await;
            let region = sdk_config
                .region()
                .map(|r| r.to_string())
                .unwrap_or_else(|| String::from("us-east-1"));
            let client = aws_sdk_s3::Client::new(&sdk_config);

            info!(bucket = %bucket, region = %region, "Using S3 storage");
            serve(config, S3Adapter::new(client, bucket, region)).await
        }
        Backend::Fs => {
            let store = FsAdapter::new(config.storage_root.clone());
            info!(root = %store.root().display(), "Using local storage");
            serve(config, store).await
        }
    }
}

async fn serve<S>(config: AppConfig, store: S) -> Result<(), Box<dyn Error + Send + Sync>>
where
    S: MediaStore + 'static,
{
    let config = Arc::new(config);
    for quality in config.qualities.iter().filter(|q| !q.is_known()) {
        warn!(quality = %quality.label, "Unknown quality, using fallback {}", quality);
    }
    let engine = Arc::new(FfmpegEngine::from_config(&config));

    // 1. Application services
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::new(store),
        engine,
        config.clone(),
    ));
    let scheduler = Scheduler::new(orchestrator.clone(), &config);
    let handle = scheduler.handle();

    // 2. Background sweeps
    let sweeps = tokio::spawn(scheduler.run());
    info!(
        workers = config.workers,
        interval_secs = config.sweep_interval.as_secs(),
        qualities = ?config.qualities.iter().map(|q| q.label.as_str()).collect::<Vec<_>>(),
        "Started sweep scheduler"
    );

    // 3. HTTP layer
    let app = http::router(AppState::new(&orchestrator, handle.clone()));
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port)).await?;
    info!("Listening at {}:{}", config.addr, config.port);

    let shutdown = handle.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown.shutdown();
        })
        .await?;

    // In-flight items finish before the scheduler returns
    handle.shutdown();
    sweeps.await?;
    Ok(())
}
