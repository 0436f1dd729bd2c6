//! Domain layer - Pure logic, no I/O besides writing the manifest file.

pub mod keys;
pub mod manifest;
pub mod outcome;
pub mod rendition;
pub mod video;

pub use manifest::MasterPlaylist;
pub use outcome::{BatchResult, FailureKind, ItemFailure, PipelineOutcome};
pub use rendition::RenditionSpec;
pub use video::{derive_video_id, SourceVideoRef};
