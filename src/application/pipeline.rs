use super::workspace::Workspace;
use crate::config::AppConfig;
use crate::domain::keys::{manifest_key, rendition_key, thumbnail_key, PLAYLIST_NAME};
use crate::domain::{FailureKind, MasterPlaylist, PipelineOutcome, RenditionSpec, SourceVideoRef};
use crate::ports::engine::{EngineError, MediaEngine};
use crate::ports::storage::{MediaStore, StoreError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to prepare local workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("failed to fetch source: {0}")]
    Fetch(#[source] StoreError),
    #[error("failed to transcode {rendition}: {source}")]
    Transcode {
        rendition: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to extract thumbnail: {0}")]
    Thumbnail(#[source] EngineError),
    #[error("failed to publish {artifact}: {source}")]
    Publish {
        artifact: String,
        #[source]
        source: StoreError,
    },
    #[error("gave up after {0:?}")]
    TimedOut(Duration),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Workspace(_) => FailureKind::WorkspaceFailed,
            PipelineError::Fetch(_) => FailureKind::FetchFailed,
            PipelineError::Transcode { rendition, .. } => FailureKind::TranscodeFailed {
                rendition: rendition.clone(),
            },
            PipelineError::Thumbnail(_) => FailureKind::ThumbnailFailed,
            PipelineError::Publish { artifact, .. } => FailureKind::PublishFailed {
                artifact: artifact.clone(),
            },
            PipelineError::TimedOut(_) => FailureKind::TimedOut,
        }
    }
}

/// Where an item is in its pipeline; only used for tracing.
#[derive(Debug, Clone, Copy)]
enum Stage<'a> {
    Fetching,
    Transcoding(&'a str),
    ManifestBuilding,
    ThumbnailExtracting,
    Publishing(&'a str),
}

impl fmt::Display for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Transcoding(quality) => write!(f, "transcoding {}", quality),
            Stage::ManifestBuilding => write!(f, "building manifest"),
            Stage::ThumbnailExtracting => write!(f, "extracting thumbnail"),
            Stage::Publishing(artifact) => write!(f, "publishing {}", artifact),
        }
    }
}

/// Drives one source video through fetch, transcode, manifest, thumbnail,
/// publish and cleanup.
pub struct ItemPipeline<S, E> {
    store: Arc<S>,
    engine: Arc<E>,
    config: Arc<AppConfig>,
}

impl<S, E> ItemPipeline<S, E>
where
    S: MediaStore,
    E: MediaEngine,
{
    pub fn new(store: Arc<S>, engine: Arc<E>, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run every stage for `item`. Never fails: errors become the outcome.
    pub async fn process(
        &self,
        item: &SourceVideoRef,
        qualities: &[RenditionSpec],
    ) -> PipelineOutcome {
        let result = match self.config.item_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(item, qualities))
                .await
                .unwrap_or(Err(PipelineError::TimedOut(limit))),
            None => self.run(item, qualities).await,
        };

        match result {
            Ok(()) => {
                info!(video_id = %item.video_id, "Video processed");
                PipelineOutcome::succeeded(item)
            }
            Err(e) => PipelineOutcome::failed(item, e.kind(), e.to_string()),
        }
    }

    async fn run(
        &self,
        item: &SourceVideoRef,
        qualities: &[RenditionSpec],
    ) -> Result<(), PipelineError> {
        let workspace = Workspace::create(&self.config.work_dir, &item.video_id)
            .map_err(PipelineError::Workspace)?;

        let result = self.run_stages(item, qualities, &workspace).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!(
                video_id = %item.video_id,
                path = %path.display(),
                "Failed to remove workspace: {}",
                e
            );
        }
        result
    }

    async fn run_stages(
        &self,
        item: &SourceVideoRef,
        qualities: &[RenditionSpec],
        workspace: &Workspace,
    ) -> Result<(), PipelineError> {
        let video_id = item.video_id.as_str();

        self.enter(video_id, Stage::Fetching);
        let source = workspace.source_path(item);
        self.store
            .download(&item.key, &source)
            .await
            .map_err(PipelineError::Fetch)?;

        // All renditions must succeed before anything is published.
        let mut renditions = Vec::with_capacity(qualities.len());
        for spec in qualities {
            self.enter(video_id, Stage::Transcoding(&spec.label));
            let dir = self.transcode(&source, spec, workspace).await?;
            renditions.push((spec, dir));
        }

        self.enter(video_id, Stage::ManifestBuilding);
        let manifest_path = workspace.manifest_path();
        MasterPlaylist::for_renditions(qualities)
            .write_to(&manifest_path)
            .await
            .map_err(PipelineError::Workspace)?;

        self.enter(video_id, Stage::ThumbnailExtracting);
        let thumbnail_path = workspace.thumbnail_path();
        self.engine
            .extract(&source, &thumbnail_path, &self.config.thumbnail_at)
            .await
            .map_err(PipelineError::Thumbnail)?;

        for (spec, dir) in &renditions {
            self.publish_rendition(video_id, spec, dir).await?;
        }
        let key = manifest_key(video_id);
        self.enter(video_id, Stage::Publishing(&key));
        self.publish(&manifest_path, &key).await?;

        let key = thumbnail_key(video_id);
        self.enter(video_id, Stage::Publishing(&key));
        self.publish(&thumbnail_path, &key).await?;

        Ok(())
    }

    fn enter(&self, video_id: &str, stage: Stage<'_>) {
        match stage {
            Stage::Transcoding(quality) => debug!(video_id, quality, "Stage: {}", stage),
            Stage::Publishing(artifact) => debug!(video_id, artifact, "Stage: {}", stage),
            _ => debug!(video_id, "Stage: {}", stage),
        }
    }

    async fn transcode(
        &self,
        source: &Path,
        spec: &RenditionSpec,
        workspace: &Workspace,
    ) -> Result<PathBuf, PipelineError> {
        let dir = workspace.rendition_dir(&spec.label);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(PipelineError::Workspace)?;

        let fail = |source| PipelineError::Transcode {
            rendition: spec.label.clone(),
            source,
        };
        self.engine.render(source, &dir, spec).await.map_err(fail)?;

        let playlist = dir.join(PLAYLIST_NAME);
        if !tokio::fs::try_exists(&playlist).await.unwrap_or(false) {
            return Err(fail(EngineError::MissingOutput(playlist)));
        }
        Ok(dir)
    }

    /// Uploads segments first and the rendition playlist last, so a published
    /// playlist never points at a missing segment.
    async fn publish_rendition(
        &self,
        video_id: &str,
        spec: &RenditionSpec,
        dir: &Path,
    ) -> Result<(), PipelineError> {
        let prefix = rendition_key(video_id, &spec.label, "");
        self.enter(video_id, Stage::Publishing(&prefix));

        let mut files = rendition_files(dir).await.map_err(|e| PipelineError::Publish {
            artifact: prefix.clone(),
            source: StoreError::Io(e),
        })?;
        files.sort_by(|a, b| (a == PLAYLIST_NAME).cmp(&(b == PLAYLIST_NAME)).then(a.cmp(b)));

        for file in files {
            let key = rendition_key(video_id, &spec.label, &file);
            self.publish(&dir.join(&file), &key).await?;
        }
        Ok(())
    }

    async fn publish(&self, local_path: &Path, key: &str) -> Result<(), PipelineError> {
        self.store
            .upload(local_path, key)
            .await
            .map_err(|source| PipelineError::Publish {
                artifact: key.to_string(),
                source,
            })
    }
}

async fn rendition_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::FsAdapter;
    use crate::application::test_support::{count_entries, test_config, ScriptedEngine};
    use crate::domain::keys::MANIFEST_NAME;
    use crate::ports::storage::MockMediaStore;
    use tempfile::tempdir;

    fn item() -> SourceVideoRef {
        SourceVideoRef::from_key("videos/clip.mp4").unwrap()
    }

    #[tokio::test]
    async fn test_success_publishes_everything_in_order() {
        let root = tempdir().unwrap();
        let work = tempdir().unwrap();
        let store = Arc::new(FsAdapter::new(root.path()));
        let scratch = tempdir().unwrap();
        let upload = scratch.path().join("clip.mp4");
        tokio::fs::write(&upload, b"source").await.unwrap();
        store.upload(&upload, "videos/clip.mp4").await.unwrap();

        let config = Arc::new(test_config(root.path(), work.path()));
        let qualities = RenditionSpec::parse_list("720p,480p");
        let pipeline = ItemPipeline::new(store.clone(), Arc::new(ScriptedEngine::new()), config);

        let outcome = pipeline.process(&item(), &qualities).await;
        assert!(outcome.is_success(), "{:?}", outcome.failure);

        let keys = store.list("").await.unwrap();
        assert!(keys.contains(&"videos-transcoded/clip/720p/playlist.m3u8".to_string()));
        assert!(keys.contains(&"videos-transcoded/clip/720p/segment_000.ts".to_string()));
        assert!(keys.contains(&"videos-transcoded/clip/480p/playlist.m3u8".to_string()));
        assert!(keys.contains(&"thumbnails/clip.jpg".to_string()));

        let manifest = store.read("videos-transcoded/clip/master.m3u8").await.unwrap();
        let manifest = String::from_utf8(manifest).unwrap();
        let first = manifest.find("720p/playlist.m3u8").unwrap();
        let second = manifest.find("480p/playlist.m3u8").unwrap();
        assert!(first < second);

        assert_eq!(count_entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store
            .expect_download()
            .returning(|key, _| Err(StoreError::NotFound(key.to_string())));
        store.expect_upload().never();

        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(ScriptedEngine::new()), config);

        let outcome = pipeline.process(&item(), &RenditionSpec::parse_list("480p")).await;
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::FetchFailed);
        assert!(failure.message.contains("videos/clip.mp4"));
        assert_eq!(count_entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_transcode_failure_publishes_nothing() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().never();

        let engine = ScriptedEngine::new().fail_render("clip", "720p");
        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(engine), config);

        let outcome = pipeline
            .process(&item(), &RenditionSpec::parse_list("1080p,720p,480p"))
            .await;
        assert_eq!(
            outcome.failure.unwrap().kind,
            FailureKind::TranscodeFailed {
                rendition: "720p".to_string()
            }
        );
        assert_eq!(count_entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_thumbnail_failure() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().never();

        let engine = ScriptedEngine::new().fail_thumbnail("clip");
        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(engine), config);

        let outcome = pipeline.process(&item(), &RenditionSpec::parse_list("480p")).await;
        assert_eq!(outcome.failure.unwrap().kind, FailureKind::ThumbnailFailed);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_earlier_artifacts() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().returning(|_, key| {
            if key.ends_with("master.m3u8") {
                Err(StoreError::Transient("bucket unavailable".to_string()))
            } else {
                Ok(())
            }
        });

        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(ScriptedEngine::new()), config);

        let outcome = pipeline.process(&item(), &RenditionSpec::parse_list("480p")).await;
        assert_eq!(
            outcome.failure.unwrap().kind,
            FailureKind::PublishFailed {
                artifact: "videos-transcoded/clip/master.m3u8".to_string()
            }
        );
        assert_eq!(count_entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_segment_publish_failure_stops_before_manifest() {
        let work = tempdir().unwrap();
        let uploads = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = uploads.clone();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().returning(move |_, key| {
            recorded.lock().unwrap().push(key.to_string());
            if key.ends_with("480p/segment_001.ts") {
                Err(StoreError::Transient("connection reset".to_string()))
            } else {
                Ok(())
            }
        });

        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(ScriptedEngine::new()), config);

        let outcome = pipeline
            .process(&item(), &RenditionSpec::parse_list("720p,480p"))
            .await;
        assert_eq!(
            outcome.failure.unwrap().kind,
            FailureKind::PublishFailed {
                artifact: "videos-transcoded/clip/480p/segment_001.ts".to_string()
            }
        );

        let uploads = uploads.lock().unwrap().clone();
        let expected: Vec<String> = [
            "720p/segment_000.ts",
            "720p/segment_001.ts",
            "720p/playlist.m3u8",
            "480p/segment_000.ts",
            "480p/segment_001.ts",
        ]
        .iter()
        .map(|file| format!("videos-transcoded/clip/{}", file))
        .collect();
        assert_eq!(uploads, expected);
        assert!(!uploads.iter().any(|key| key.ends_with(MANIFEST_NAME)));
        assert!(!uploads.iter().any(|key| key.starts_with("thumbnails/")));
        assert_eq!(count_entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_playlist_counts_as_transcode_failure() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().never();

        let engine = ScriptedEngine::new().silent_render("clip", "480p");
        let config = Arc::new(test_config(work.path(), work.path()));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(engine), config);

        let outcome = pipeline.process(&item(), &RenditionSpec::parse_list("480p")).await;
        let failure = outcome.failure.unwrap();
        assert_eq!(
            failure.kind,
            FailureKind::TranscodeFailed {
                rendition: "480p".to_string()
            }
        );
        assert!(failure.message.contains("no output"));
    }

    #[tokio::test]
    async fn test_timeout_cleans_up() {
        let work = tempdir().unwrap();
        let mut store = MockMediaStore::new();
        store.expect_download().returning(|_, path| {
            std::fs::write(path, b"source")?;
            Ok(())
        });
        store.expect_upload().never();

        let engine = ScriptedEngine::new().stall_render("clip");
        let mut config = test_config(work.path(), work.path());
        config.item_timeout = Some(Duration::from_millis(50));
        let pipeline = ItemPipeline::new(Arc::new(store), Arc::new(engine), Arc::new(config));

        let outcome = pipeline.process(&item(), &RenditionSpec::parse_list("480p")).await;
        assert_eq!(outcome.failure.unwrap().kind, FailureKind::TimedOut);
        assert_eq!(count_entries(work.path()), 0);
    }

    #[test]
    fn test_playlist_sorts_last() {
        let mut files = vec![
            PLAYLIST_NAME.to_string(),
            "segment_001.ts".to_string(),
            "segment_000.ts".to_string(),
        ];
        files.sort_by(|a, b| (a == PLAYLIST_NAME).cmp(&(b == PLAYLIST_NAME)).then(a.cmp(b)));
        assert_eq!(files, vec!["segment_000.ts", "segment_001.ts", PLAYLIST_NAME]);
    }
}
