use std::fmt;

/// Bitrate ladder: quality label, bits per second, resolution.
const LADDER: &[(&str, u64, &str)] = &[
    ("1080p", 5_000_000, "1920x1080"),
    ("720p", 2_500_000, "1280x720"),
    ("480p", 1_000_000, "854x480"),
];

/// Pair used for any label missing from `LADDER`.
const FALLBACK: (u64, &str) = (500_000, "640x360");

/// One named quality tier and the encoder settings it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    pub label: String,
    /// Target video bitrate in bits per second.
    pub bandwidth: u64,
    /// `WIDTHxHEIGHT`
    pub resolution: &'static str,
}

impl RenditionSpec {
    /// Resolve a quality label against the ladder. Unknown labels get the
    /// fallback pair but keep their own label.
    pub fn lookup(label: &str) -> Self {
        let (bandwidth, resolution) = LADDER
            .iter()
            .find(|(name, _, _)| *name == label)
            .map(|(_, bandwidth, resolution)| (*bandwidth, *resolution))
            .unwrap_or(FALLBACK);

        Self {
            label: label.to_string(),
            bandwidth,
            resolution,
        }
    }

    pub fn is_known(&self) -> bool {
        LADDER.iter().any(|(name, _, _)| *name == self.label)
    }

    /// The label names a directory in the workspace and in storage keys, so
    /// only ASCII letters, digits, `-` and `_` are allowed.
    pub fn is_path_safe(&self) -> bool {
        !self.label.is_empty()
            && self
                .label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Bitrate in kbit/s, the unit ffmpeg's `-b:v` expects.
    pub fn kbps(&self) -> u64 {
        self.bandwidth / 1000
    }

    /// Parse a comma-separated quality list, keeping the order given.
    /// Blank entries are skipped and repeated labels keep their first position.
    pub fn parse_list(raw: &str) -> Vec<RenditionSpec> {
        let mut specs: Vec<RenditionSpec> = Vec::new();
        for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            if specs.iter().any(|s| s.label == label) {
                continue;
            }
            specs.push(Self::lookup(label));
        }
        specs
    }
}

impl fmt::Display for RenditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bps, {})", self.label, self.bandwidth, self.resolution)
    }
}
