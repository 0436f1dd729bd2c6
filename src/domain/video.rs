/// Container extensions stripped when deriving a video id (compared lowercase).
const CONTAINER_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "mkv", "webm", "avi", "flv", "wmv", "mpg", "mpeg", "ts",
];

/// A source object waiting to be transcoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVideoRef {
    /// Full storage key, e.g. `videos/clip.mp4`
    pub key: String,
    pub video_id: String,
}

impl SourceVideoRef {
    /// Returns `None` for keys that cannot name a video (folder markers, bare
    /// extensions).
    pub fn from_key(key: &str) -> Option<Self> {
        let video_id = derive_video_id(key);
        if video_id.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            video_id,
        })
    }

    /// Last path component of the key.
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }

    /// Extension of the source file, if any.
    pub fn extension(&self) -> Option<&str> {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// Derive the stable video id from a storage key: the last path component
/// with every trailing container extension removed.
///
/// `derive_video_id(derive_video_id(k)) == derive_video_id(k)` for any key.
pub fn derive_video_id(key: &str) -> String {
    let mut id = file_name(key);
    while let Some(stem) = strip_container(id) {
        id = stem;
    }
    id.to_string()
}

fn file_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

fn strip_container(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
        Some(stem)
    } else {
        None
    }
}
