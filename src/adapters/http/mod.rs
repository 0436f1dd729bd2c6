//! On-demand HTTP API: upload or process a single video, trigger a sweep,
//! and browse what has been published.

pub mod error;
pub mod handlers;

use crate::application::{BatchOrchestrator, ItemPipeline, SchedulerHandle};
use crate::domain::RenditionSpec;
use crate::ports::engine::MediaEngine;
use crate::ports::storage::MediaStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;

pub use error::ApiError;

pub struct AppState<S, E> {
    pub store: Arc<S>,
    pub pipeline: Arc<ItemPipeline<S, E>>,
    pub scheduler: SchedulerHandle,
    pub qualities: Arc<[RenditionSpec]>,
    /// Uploads are staged here before going to the store
    pub work_dir: PathBuf,
    /// Caps pipelines started over HTTP
    pub on_demand: Arc<Semaphore>,
}

impl<S, E> Clone for AppState<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pipeline: self.pipeline.clone(),
            scheduler: self.scheduler.clone(),
            qualities: self.qualities.clone(),
            work_dir: self.work_dir.clone(),
            on_demand: self.on_demand.clone(),
        }
    }
}

impl<S, E> AppState<S, E>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    pub fn new(orchestrator: &BatchOrchestrator<S, E>, scheduler: SchedulerHandle) -> Self {
        let config = orchestrator.config();
        Self {
            store: orchestrator.store(),
            pipeline: orchestrator.pipeline(),
            scheduler,
            qualities: config.qualities.clone(),
            work_dir: config.work_dir.clone(),
            on_demand: Arc::new(Semaphore::new(config.max_on_demand)),
        }
    }
}

pub fn router<S, E>(state: AppState<S, E>) -> Router
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    Router::new()
        .route("/upload", post(handlers::upload::<S, E>))
        .route("/process", post(handlers::process::<S, E>))
        .route("/sweep", post(handlers::sweep::<S, E>))
        .route("/videos", get(handlers::list_videos::<S, E>))
        .route("/videos/:id", get(handlers::video_resolutions::<S, E>))
        .route("/thumbnails/:id", get(handlers::thumbnail::<S, E>))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
