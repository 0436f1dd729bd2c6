//! hlsweep - Batch HLS transcoding service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (renditions, key layout, manifests, outcomes)
//! - ports/: Trait definitions (object store, transcode and thumbnail engines)
//! - adapters/: Concrete implementations (S3, local filesystem, ffmpeg, HTTP)
//! - application/: Generic services (item pipeline, sweep orchestrator, scheduler)
//! - config: Environment configuration
//!
//! A sweep lists every source under `videos/`, transcodes each one into an
//! HLS rendition ladder with a bounded pool of workers, and publishes the
//! playlists, a master manifest and a thumbnail under `videos-transcoded/`
//! and `thumbnails/`. The scheduler repeats sweeps on a fixed interval.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::{BatchOrchestrator, ItemPipeline, Scheduler, SchedulerHandle};
pub use config::AppConfig;
pub use domain::{BatchResult, PipelineOutcome, RenditionSpec};
