//! Process configuration, loaded once at start-up.

use crate::domain::RenditionSpec;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} env var required")]
    Missing(&'static str),
    #[error("{0}")]
    Rejected(&'static str),
}

/// Where source videos and published artifacts live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    S3,
    /// Local directory tree, one file per object key
    Fs,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    pub backend: Backend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Root directory for the fs backend
    pub storage_root: PathBuf,
    /// Parent directory for per-item scratch directories
    pub work_dir: PathBuf,
    /// Renditions produced for every video, in manifest order
    pub qualities: Arc<[RenditionSpec]>,
    /// Concurrent pipelines per sweep
    pub workers: usize,
    pub sweep_interval: Duration,
    /// Deadline for one item's pipeline; `None` waits indefinitely
    pub item_timeout: Option<Duration>,
    /// Skip sources whose manifest is already published
    pub skip_published: bool,
    pub thumbnail_at: String,
    pub ffmpeg_bin: String,
    /// Target HLS segment length
    pub segment_seconds: u32,
    /// Concurrent on-demand pipelines started over HTTP
    pub max_on_demand: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: String::from("0.0.0.0"),
            port: 8080,
            backend: Backend::S3,
            s3_bucket: None,
            s3_region: None,
            storage_root: PathBuf::from("./storage"),
            work_dir: env::temp_dir(),
            qualities: RenditionSpec::parse_list("1080p,720p,480p").into(),
            workers: 5,
            sweep_interval: Duration::from_secs(25 * 60),
            item_timeout: None,
            skip_published: true,
            thumbnail_at: String::from("00:00:01.000"),
            ffmpeg_bin: String::from("ffmpeg"),
            segment_seconds: 6,
            max_on_demand: 2,
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(addr) = var("ADDR") {
            config.addr = addr;
        }
        if let Some(port) = var("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(backend) = var("STORAGE_BACKEND") {
            config.backend = match backend.to_ascii_lowercase().as_str() {
                "s3" => Backend::S3,
                "fs" | "local" => Backend::Fs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "STORAGE_BACKEND",
                        value: backend,
                    })
                }
            };
        }
        config.s3_bucket = var("S3_BUCKET_NAME");
        config.s3_region = var("AWS_REGION");
        if let Some(root) = var("STORAGE_PATH") {
            config.storage_root = PathBuf::from(root);
        }
        if let Some(dir) = var("WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(qualities) = var("VIDEO_QUALITIES") {
            config.qualities = RenditionSpec::parse_list(&qualities).into();
        }
        if let Some(workers) = var("SWEEP_WORKERS") {
            config.workers = parse("SWEEP_WORKERS", &workers)?;
        }
        if let Some(secs) = var("SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(parse("SWEEP_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = var("ITEM_TIMEOUT_SECS") {
            config.item_timeout = Some(Duration::from_secs(parse("ITEM_TIMEOUT_SECS", &secs)?));
        }
        if let Some(skip) = var("SKIP_PUBLISHED") {
            config.skip_published = parse("SKIP_PUBLISHED", &skip)?;
        }
        if let Some(at) = var("THUMBNAIL_AT") {
            config.thumbnail_at = at;
        }
        if let Some(bin) = var("FFMPEG_BIN") {
            config.ffmpeg_bin = bin;
        }
        if let Some(secs) = var("HLS_SEGMENT_SECS") {
            config.segment_seconds = parse("HLS_SEGMENT_SECS", &secs)?;
        }
        if let Some(max) = var("MAX_CONCURRENT_UPLOADS") {
            config.max_on_demand = parse("MAX_CONCURRENT_UPLOADS", &max)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Rejected("SWEEP_WORKERS must be greater than 0"));
        }
        if self.qualities.is_empty() {
            return Err(ConfigError::Rejected("VIDEO_QUALITIES must name at least one quality"));
        }
        if let Some(quality) = self.qualities.iter().find(|q| !q.is_path_safe()) {
            return Err(ConfigError::Invalid {
                var: "VIDEO_QUALITIES",
                value: quality.label.clone(),
            });
        }
        if self.item_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Rejected("ITEM_TIMEOUT_SECS must be greater than 0"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Rejected("SWEEP_INTERVAL_SECS must be greater than 0"));
        }
        if self.max_on_demand == 0 {
            return Err(ConfigError::Rejected("MAX_CONCURRENT_UPLOADS must be greater than 0"));
        }
        if self.segment_seconds == 0 {
            return Err(ConfigError::Rejected("HLS_SEGMENT_SECS must be greater than 0"));
        }
        if self.backend == Backend::S3 && self.s3_bucket.is_none() {
            return Err(ConfigError::Missing("S3_BUCKET_NAME"));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
