use crate::config::AppConfig;
use crate::domain::keys::PLAYLIST_NAME;
use crate::domain::RenditionSpec;
use crate::ports::engine::{EngineError, ThumbnailEngine, TranscodeEngine};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Keep only the end of ffmpeg's stderr in errors; the useful part is last.
const STDERR_TAIL: usize = 2000;

/// Runs the `ffmpeg` binary for both renditions and thumbnails.
#[derive(Clone, Debug)]
pub struct FfmpegEngine {
    program: String,
    segment_seconds: u32,
}

impl FfmpegEngine {
    pub fn new(program: impl Into<String>, segment_seconds: u32) -> Self {
        Self {
            program: program.into(),
            segment_seconds,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ffmpeg_bin.clone(), config.segment_seconds)
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), EngineError> {
        debug!(program = %self.program, ?args, "Running ffmpeg");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL);
            let start = (start..stderr.len())
                .find(|i| stderr.is_char_boundary(*i))
                .unwrap_or(stderr.len());
            return Err(EngineError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr[start..].trim().to_string(),
            });
        }
        Ok(())
    }
}

fn os(value: impl Into<OsString>) -> OsString {
    value.into()
}

/// H.264/AAC HLS output with fixed-length segments.
pub fn render_args(
    input: &Path,
    output_dir: &Path,
    rendition: &RenditionSpec,
    segment_seconds: u32,
) -> Vec<OsString> {
    vec![
        os("-y"),
        os("-i"),
        input.as_os_str().to_owned(),
        os("-preset"),
        os("fast"),
        os("-c:v"),
        os("libx264"),
        os("-b:v"),
        os(format!("{}k", rendition.kbps())),
        os("-s"),
        os(rendition.resolution),
        os("-c:a"),
        os("aac"),
        os("-f"),
        os("hls"),
        os("-hls_time"),
        os(segment_seconds.to_string()),
        os("-hls_playlist_type"),
        os("vod"),
        os("-hls_segment_filename"),
        output_dir.join("segment_%03d.ts").into_os_string(),
        output_dir.join(PLAYLIST_NAME).into_os_string(),
    ]
}

pub fn thumbnail_args(input: &Path, output: &Path, at: &str) -> Vec<OsString> {
    vec![
        os("-y"),
        os("-ss"),
        os(at),
        os("-i"),
        input.as_os_str().to_owned(),
        os("-vframes"),
        os("1"),
        output.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn render(
        &self,
        input: &Path,
        output_dir: &Path,
        rendition: &RenditionSpec,
    ) -> Result<(), EngineError> {
        self.run(render_args(input, output_dir, rendition, self.segment_seconds))
            .await
    }
}

#[async_trait]
impl ThumbnailEngine for FfmpegEngine {
    async fn extract(&self, input: &Path, output: &Path, at: &str) -> Result<(), EngineError> {
        self.run(thumbnail_args(input, output, at)).await?;
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(EngineError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}
