//! Object store key layout. Players resolve these paths directly, so the
//! format must not change.

pub const SOURCE_PREFIX: &str = "videos/";
pub const TRANSCODED_PREFIX: &str = "videos-transcoded/";
pub const THUMBNAIL_PREFIX: &str = "thumbnails/";

pub const MANIFEST_NAME: &str = "master.m3u8";
pub const PLAYLIST_NAME: &str = "playlist.m3u8";

pub fn source_key(file_name: &str) -> String {
    format!("{}{}", SOURCE_PREFIX, file_name)
}

/// `videos-transcoded/{video_id}/`
pub fn video_prefix(video_id: &str) -> String {
    format!("{}{}/", TRANSCODED_PREFIX, video_id)
}

/// `videos-transcoded/{video_id}/{quality}/{file_name}`
pub fn rendition_key(video_id: &str, quality: &str, file_name: &str) -> String {
    format!("{}{}/{}", video_prefix(video_id), quality, file_name)
}

pub fn manifest_key(video_id: &str) -> String {
    format!("{}{}", video_prefix(video_id), MANIFEST_NAME)
}

pub fn thumbnail_key(video_id: &str) -> String {
    format!("{}{}.jpg", THUMBNAIL_PREFIX, video_id)
}

/// Playlist path as referenced from the manifest.
pub fn relative_playlist(quality: &str) -> String {
    format!("{}/{}", quality, PLAYLIST_NAME)
}

/// Video id of a published manifest key, `None` for any other key.
pub fn published_video_id(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(TRANSCODED_PREFIX)?;
    let (video_id, name) = rest.split_once('/')?;
    (name == MANIFEST_NAME && !video_id.is_empty()).then_some(video_id)
}

/// Splits `videos-transcoded/{video_id}/{quality}/{file}` into quality and file.
pub fn rendition_parts<'a>(video_id: &str, key: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = key.strip_prefix(TRANSCODED_PREFIX)?.strip_prefix(video_id)?;
    let (quality, file) = rest.strip_prefix('/')?.split_once('/')?;
    (!quality.is_empty() && !file.is_empty() && !file.contains('/')).then_some((quality, file))
}

pub fn content_type(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("m4s") | Some("mp4") => "video/mp4",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(source_key("a.mp4"), "videos/a.mp4");
        assert_eq!(
            rendition_key("a", "720p", PLAYLIST_NAME),
            "videos-transcoded/a/720p/playlist.m3u8"
        );
        assert_eq!(manifest_key("a"), "videos-transcoded/a/master.m3u8");
        assert_eq!(thumbnail_key("a"), "thumbnails/a.jpg");
        assert_eq!(relative_playlist("480p"), "480p/playlist.m3u8");
    }

    #[test]
    fn test_published_video_id() {
        assert_eq!(
            published_video_id("videos-transcoded/abc/master.m3u8"),
            Some("abc")
        );
        assert_eq!(published_video_id("videos-transcoded/abc/720p/playlist.m3u8"), None);
        assert_eq!(published_video_id("videos/abc.mp4"), None);
        assert_eq!(published_video_id("videos-transcoded//master.m3u8"), None);
    }

    #[test]
    fn test_rendition_parts() {
        assert_eq!(
            rendition_parts("abc", "videos-transcoded/abc/720p/segment_001.ts"),
            Some(("720p", "segment_001.ts"))
        );
        assert_eq!(rendition_parts("abc", "videos-transcoded/abc/master.m3u8"), None);
        assert_eq!(rendition_parts("ab", "videos-transcoded/abc/720p/x.ts"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("x/master.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type("x/segment_000.ts"), "video/mp2t");
        assert_eq!(content_type("thumbnails/a.jpg"), "image/jpeg");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
