use crate::domain::SourceVideoRef;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory owned by one pipeline run. Everything inside is removed
/// when the workspace is closed or dropped, including when the owning future
/// is cancelled.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates `{parent}/{video_id}-XXXXXX`. The random suffix keeps two
    /// workers apart even if they handle the same video id.
    pub fn create(parent: &Path, video_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", sanitize(video_id)))
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Local copy of the source, keeping its extension so ffmpeg can probe it.
    pub fn source_path(&self, item: &SourceVideoRef) -> PathBuf {
        match item.extension() {
            Some(ext) => self.path().join(format!("source.{}", sanitize(ext))),
            None => self.path().join("source"),
        }
    }

    pub fn rendition_dir(&self, quality: &str) -> PathBuf {
        self.path().join("renditions").join(sanitize(quality))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("master.m3u8")
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.path().join("thumbnail.jpg")
    }

    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
