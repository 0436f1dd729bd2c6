use crate::domain::RenditionSpec;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("no output produced at {0}")]
    MissingOutput(PathBuf),
}

/// Renders one rendition of a source file as a segmented HLS playlist.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Writes `playlist.m3u8` and its segments into `output_dir`.
    async fn render(
        &self,
        input: &Path,
        output_dir: &Path,
        rendition: &RenditionSpec,
    ) -> Result<(), EngineError>;
}

/// Grabs a single still frame from a source file.
#[async_trait]
pub trait ThumbnailEngine: Send + Sync {
    /// `at` is an ffmpeg timestamp such as `00:00:01.000`.
    async fn extract(&self, input: &Path, output: &Path, at: &str) -> Result<(), EngineError>;
}

/// Both engines behind one handle.
pub trait MediaEngine: TranscodeEngine + ThumbnailEngine {}

impl<T: TranscodeEngine + ThumbnailEngine> MediaEngine for T {}
