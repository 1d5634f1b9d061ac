//! Content keys and usage rules.
//!
//! A usage rule associates a content key with the conditions under which it
//! may be used. The engine stores and signs rules but never enforces them
//! during save or load; [`crate::CpixDocument::resolve_content_key`] is the
//! only place they are evaluated, and only on request.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use cpix_core::{bytes_to_array, KeyId};

/// Length of a content key value in bytes (AES-128).
pub const CONTENT_KEY_LEN: usize = 16;

/// The raw bytes of a content key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKeyValue([u8; CONTENT_KEY_LEN]);

impl ContentKeyValue {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> cpix_core::Result<Self> {
        bytes_to_array("content key value", bytes).map(Self)
    }

    /// Generate random key bytes.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContentKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKeyValue(..)")
    }
}

/// A content key: an identifier and, when known, its value.
///
/// `value` is `None` on a loaded document when the caller held no credential
/// for any recipient of the document. That is an expected outcome, not an
/// error. Two content keys are equal when their ids are equal.
#[derive(Debug, Clone)]
pub struct ContentKey {
    /// Unique identifier within the document.
    pub id: KeyId,
    /// Key bytes, if available to this party.
    pub value: Option<ContentKeyValue>,
}

impl ContentKey {
    /// Create a content key with a known value.
    pub fn new(id: KeyId, value: [u8; CONTENT_KEY_LEN]) -> Self {
        Self {
            id,
            value: Some(ContentKeyValue::from_bytes(value)),
        }
    }

    /// Create a content key with a random id and value.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            id: KeyId::generate_with(rng),
            value: Some(ContentKeyValue::generate_with(rng)),
        }
    }

    /// Whether the value is available.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContentKey {}

impl Hash for ContentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One condition of a usage rule. All bounds are inclusive and optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageFilter {
    /// Video tracks whose pixel count is within bounds.
    Video {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_pixels: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_pixels: Option<u64>,
    },
    /// Audio tracks whose channel count is within bounds.
    Audio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_channels: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_channels: Option<u64>,
    },
    /// Tracks whose bitrate is within bounds.
    Bitrate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_bps: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_bps: Option<u64>,
    },
    /// Tracks carrying the given label.
    Label { label: String },
}

fn within(value: u64, min: Option<u64>, max: Option<u64>) -> bool {
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}

impl UsageFilter {
    /// Check whether the context satisfies this filter.
    pub fn matches(&self, context: &ContentKeyContext) -> bool {
        match (self, &context.track) {
            (
                UsageFilter::Video {
                    min_pixels,
                    max_pixels,
                },
                TrackKind::Video { pixels },
            ) => within(*pixels, *min_pixels, *max_pixels),
            (UsageFilter::Video { .. }, _) => false,
            (
                UsageFilter::Audio {
                    min_channels,
                    max_channels,
                },
                TrackKind::Audio { channels },
            ) => within(*channels, *min_channels, *max_channels),
            (UsageFilter::Audio { .. }, _) => false,
            (UsageFilter::Bitrate { min_bps, max_bps }, _) => context
                .bitrate_bps
                .map_or(false, |bps| within(bps, *min_bps, *max_bps)),
            (UsageFilter::Label { label }, _) => context.labels.iter().any(|l| l == label),
        }
    }
}

/// A usage rule for one content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRule {
    /// The content key this rule applies to. May name a key that is not in
    /// the document; that is reported, never rejected.
    pub key_id: KeyId,
    /// Conditions, all of which must hold. An empty list matches any context.
    pub filters: Vec<UsageFilter>,
}

impl UsageRule {
    /// A rule with no conditions.
    pub fn new(key_id: KeyId) -> Self {
        Self {
            key_id,
            filters: Vec::new(),
        }
    }

    /// Add a condition.
    pub fn with_filter(mut self, filter: UsageFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Check whether every filter matches the context.
    pub fn matches(&self, context: &ContentKeyContext) -> bool {
        self.filters.iter().all(|f| f.matches(context))
    }
}

/// The kind of media track a key is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// A video track with the given number of pixels per frame.
    Video { pixels: u64 },
    /// An audio track with the given number of channels.
    Audio { channels: u64 },
}

/// Describes a media track for content key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKeyContext {
    /// Track kind and its dimension.
    pub track: TrackKind,
    /// Track bitrate, if known.
    pub bitrate_bps: Option<u64>,
    /// Labels attached to the track.
    pub labels: Vec<String>,
}

impl ContentKeyContext {
    /// A video track of `pixels` pixels per frame.
    pub fn video(pixels: u64) -> Self {
        Self {
            track: TrackKind::Video { pixels },
            bitrate_bps: None,
            labels: Vec::new(),
        }
    }

    /// An audio track with `channels` channels.
    pub fn audio(channels: u64) -> Self {
        Self {
            track: TrackKind::Audio { channels },
            bitrate_bps: None,
            labels: Vec::new(),
        }
    }

    /// Set the bitrate.
    pub fn with_bitrate(mut self, bps: u64) -> Self {
        self.bitrate_bps = Some(bps);
        self
    }

    /// Add a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}
