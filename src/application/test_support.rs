//! Fakes shared by the application tests. No ffmpeg, no network.

use crate::adapters::local::FsAdapter;
use crate::config::{AppConfig, Backend};
use crate::domain::keys::PLAYLIST_NAME;
use crate::domain::RenditionSpec;
use crate::ports::engine::{EngineError, ThumbnailEngine, TranscodeEngine};
use crate::ports::storage::MediaStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub fn test_config(storage_root: &Path, work_dir: &Path) -> AppConfig {
    AppConfig {
        backend: Backend::Fs,
        storage_root: storage_root.to_path_buf(),
        work_dir: work_dir.to_path_buf(),
        workers: 2,
        ..AppConfig::default()
    }
}

/// Number of entries directly under `dir`; 0 if it does not exist.
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Put a fake source video at `videos/{file_name}`.
pub async fn seed_source(store: &FsAdapter, file_name: &str) {
    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join(file_name);
    tokio::fs::write(&path, file_name.as_bytes()).await.unwrap();
    store
        .upload(&path, &format!("videos/{}", file_name))
        .await
        .unwrap();
}

/// Engine that writes plausible HLS output and fails where told to.
///
/// The video id is recovered from the workspace directory name
/// (`{video_id}-XXXXXX`) that holds the source file.
#[derive(Default)]
pub struct ScriptedEngine {
    failing_renders: HashSet<(String, String)>,
    silent_renders: HashSet<(String, String)>,
    failing_thumbnails: HashSet<String>,
    stalling: HashSet<String>,
    panicking: HashSet<String>,
    cancel_on: HashMap<String, CancellationToken>,
    renders: Mutex<Vec<(String, String)>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_render(mut self, video_id: &str, quality: &str) -> Self {
        self.failing_renders
            .insert((video_id.to_string(), quality.to_string()));
        self
    }

    /// Render "succeeds" without writing a playlist.
    pub fn silent_render(mut self, video_id: &str, quality: &str) -> Self {
        self.silent_renders
            .insert((video_id.to_string(), quality.to_string()));
        self
    }

    pub fn fail_thumbnail(mut self, video_id: &str) -> Self {
        self.failing_thumbnails.insert(video_id.to_string());
        self
    }

    /// Every render for `video_id` hangs forever.
    pub fn stall_render(mut self, video_id: &str) -> Self {
        self.stalling.insert(video_id.to_string());
        self
    }

    pub fn panic_render(mut self, video_id: &str) -> Self {
        self.panicking.insert(video_id.to_string());
        self
    }

    /// Cancel `token` as soon as `video_id` starts rendering.
    pub fn cancel_on(mut self, video_id: &str, token: CancellationToken) -> Self {
        self.cancel_on.insert(video_id.to_string(), token);
        self
    }

    /// `(video_id, quality)` for every render call, in call order.
    pub fn renders(&self) -> Vec<(String, String)> {
        self.renders.lock().unwrap().clone()
    }

    pub fn renders_for(&self, video_id: &str) -> usize {
        self.renders()
            .iter()
            .filter(|(id, _)| id == video_id)
            .count()
    }
}

fn video_id_of(input: &Path) -> String {
    input
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once('-'))
        .map(|(id, _)| id.to_string())
        .unwrap_or_default()
}

fn scripted_failure(what: &str) -> EngineError {
    EngineError::Failed {
        program: "ffmpeg".to_string(),
        status: "exit status: 1".to_string(),
        stderr: format!("scripted {} failure", what),
    }
}

#[async_trait]
impl TranscodeEngine for ScriptedEngine {
    async fn render(
        &self,
        input: &Path,
        output_dir: &Path,
        rendition: &RenditionSpec,
    ) -> Result<(), EngineError> {
        let video_id = video_id_of(input);
        let call = (video_id.clone(), rendition.label.clone());
        self.renders.lock().unwrap().push(call.clone());

        if let Some(token) = self.cancel_on.get(&video_id) {
            token.cancel();
        }
        if self.panicking.contains(&video_id) {
            panic!("scripted panic for {}", video_id);
        }
        if self.stalling.contains(&video_id) {
            std::future::pending::<()>().await;
        }
        if self.failing_renders.contains(&call) {
            return Err(scripted_failure("render"));
        }
        if self.silent_renders.contains(&call) {
            return Ok(());
        }

        for segment in ["segment_000.ts", "segment_001.ts"] {
            tokio::fs::write(output_dir.join(segment), b"ts").await.unwrap();
        }
        let playlist = "#EXTM3U\n\
                        #EXTINF:6.0,\nsegment_000.ts\n\
                        #EXTINF:6.0,\nsegment_001.ts\n\
                        #EXT-X-ENDLIST\n";
        tokio::fs::write(output_dir.join(PLAYLIST_NAME), playlist)
            .await
            .unwrap();
        Ok(())
    }
}

#[async_trait]
impl ThumbnailEngine for ScriptedEngine {
    async fn extract(&self, input: &Path, output: &Path, _at: &str) -> Result<(), EngineError> {
        if self.failing_thumbnails.contains(&video_id_of(input)) {
            return Err(scripted_failure("thumbnail"));
        }
        tokio::fs::write(output, b"jpg").await.unwrap();
        Ok(())
    }
}
