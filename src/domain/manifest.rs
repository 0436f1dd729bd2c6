use super::keys::relative_playlist;
use super::rendition::RenditionSpec;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct VariantStream {
    pub bandwidth: u64,
    pub resolution: String,
    /// Playlist URI relative to the manifest
    pub uri: String,
}

/// Top-level playlist pointing at one media playlist per rendition.
#[derive(Default)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// One variant per rendition, in the order given.
    pub fn for_renditions(renditions: &[RenditionSpec]) -> Self {
        let mut playlist = Self::new();
        for spec in renditions {
            playlist.add_variant(spec);
        }
        playlist
    }

    pub fn add_variant(&mut self, spec: &RenditionSpec) {
        self.variants.push(VariantStream {
            bandwidth: spec.bandwidth,
            resolution: spec.resolution.to_string(),
            uri: relative_playlist(&spec.label),
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        for variant in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n",
                variant.bandwidth, variant.resolution
            ));
            out.push_str(&variant.uri);
            out.push('\n');
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
