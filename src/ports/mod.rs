//! Ports - Traits the application layer is written against.

pub mod engine;
pub mod storage;

pub use engine::{EngineError, MediaEngine, ThumbnailEngine, TranscodeEngine};
pub use storage::{MediaStore, StoreError};
