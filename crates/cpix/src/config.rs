//! Document engine configuration.

/// Default upper bound on the size of a loaded artifact (16 MiB).
pub const DEFAULT_MAX_ARTIFACT_LEN: usize = 16 * 1024 * 1024;

/// Configuration for saving and loading documents.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Pretty-print the text artifact.
    pub pretty: bool,
    /// Artifacts larger than this are rejected before parsing.
    pub max_artifact_len: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            max_artifact_len: DEFAULT_MAX_ARTIFACT_LEN,
        }
    }
}

impl DocumentConfig {
    /// Compact output, otherwise default settings.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::default()
        }
    }
}
