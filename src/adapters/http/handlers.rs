use super::error::ApiError;
use super::AppState;
use crate::domain::keys::{
    manifest_key, published_video_id, rendition_parts, source_key, thumbnail_key, video_prefix,
    TRANSCODED_PREFIX,
};
use crate::domain::SourceVideoRef;
use crate::ports::engine::MediaEngine;
use crate::ports::storage::MediaStore;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{BoxError, Json};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    #[serde(rename = "videoKey")]
    pub video_key: String,
}

#[derive(Debug, Serialize)]
pub struct Processed {
    #[serde(rename = "videoID")]
    pub video_id: String,
    pub manifest: String,
}

#[derive(Debug, Serialize)]
pub struct VideoResolutions {
    #[serde(rename = "videoID")]
    pub video_id: String,
    /// Quality label to public URLs of its playlist and segments
    pub resolutions: BTreeMap<String, Vec<String>>,
}

/// Stores the multipart field `file` under `videos/` and processes it.
pub async fn upload<S, E>(
    State(state): State<AppState<S, E>>,
    mut multipart: Multipart,
) -> Result<Json<Processed>, ApiError>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("file field has no file name".to_string()))?;
        let item = source_ref(&file_name)?;

        tokio::fs::create_dir_all(&state.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(&state.work_dir)?;
        let path = scratch.path().join(item.file_name());
        stream_to_file(&path, field).await?;
        state.store.upload(&path, &item.key).await?;
        scratch.close()?;
        info!(key = %item.key, "Stored upload");

        return process_item(&state, item).await.map(Json);
    }
    Err(ApiError::BadRequest(
        "multipart field `file` is required".to_string(),
    ))
}

/// Processes an already stored `videos/{videoKey}`.
pub async fn process<S, E>(
    State(state): State<AppState<S, E>>,
    Query(query): Query<ProcessQuery>,
) -> Result<Json<Processed>, ApiError>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    let item = source_ref(&query.video_key)?;
    process_item(&state, item).await.map(Json)
}

pub async fn sweep<S, E>(State(state): State<AppState<S, E>>) -> Result<StatusCode, ApiError> {
    if state.scheduler.is_shut_down() {
        return Err(ApiError::Unavailable);
    }
    state.scheduler.trigger();
    Ok(StatusCode::ACCEPTED)
}

/// Ids of every video with a published manifest.
pub async fn list_videos<S, E>(
    State(state): State<AppState<S, E>>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: MediaStore + 'static,
{
    let ids: Vec<String> = state
        .store
        .list(TRANSCODED_PREFIX)
        .await?
        .iter()
        .filter_map(|key| published_video_id(key))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ApiError::NotFound("videos".to_string()));
    }
    Ok(Json(ids))
}

pub async fn video_resolutions<S, E>(
    State(state): State<AppState<S, E>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResolutions>, ApiError>
where
    S: MediaStore + 'static,
{
    validate_name(&video_id)?;

    let mut resolutions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in state.store.list(&video_prefix(&video_id)).await? {
        if let Some((quality, _)) = rendition_parts(&video_id, &key) {
            resolutions
                .entry(quality.to_string())
                .or_default()
                .push(state.store.public_url(&key));
        }
    }

    if resolutions.is_empty() {
        return Err(ApiError::NotFound(format!("renditions of {}", video_id)));
    }
    Ok(Json(VideoResolutions {
        video_id,
        resolutions,
    }))
}

pub async fn thumbnail<S, E>(
    State(state): State<AppState<S, E>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: MediaStore + 'static,
{
    validate_name(&video_id)?;
    let bytes = state.store.read(&thumbnail_key(&video_id)).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

async fn process_item<S, E>(
    state: &AppState<S, E>,
    item: SourceVideoRef,
) -> Result<Processed, ApiError>
where
    S: MediaStore + 'static,
    E: MediaEngine + 'static,
{
    let _permit = state
        .on_demand
        .acquire()
        .await
        .map_err(|_| ApiError::Unavailable)?;

    let outcome = state.pipeline.process(&item, &state.qualities).await;
    match outcome.failure {
        None => Ok(Processed {
            manifest: state.store.public_url(&manifest_key(&item.video_id)),
            video_id: item.video_id,
        }),
        Some(failure) => Err(ApiError::Pipeline(failure)),
    }
}

fn source_ref(file_name: &str) -> Result<SourceVideoRef, ApiError> {
    validate_name(file_name)?;
    SourceVideoRef::from_key(&source_key(file_name))
        .ok_or_else(|| ApiError::BadRequest(format!("no video id in {:?}", file_name)))
}

/// Names from clients become single key components: no separators, no `..`.
pub(crate) fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(ApiError::BadRequest(format!("invalid name {:?}", name)));
    }
    Ok(())
}

// Save a `Stream` to a file
pub(crate) async fn stream_to_file<S, E>(path: &std::path::Path, stream: S) -> io::Result<()>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;
    Ok(())
}
