//! Media assets referenced by clips.
//!
//! Adding a clip (or changing its url) registers an asset for the clip's
//! media if none exists yet. Assets are never removed when their clips are;
//! they remain available for reuse until the project is reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media type of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Audio,
    Video,
    Image,
}

impl AssetKind {
    /// Prefix for generated ids, e.g. `asset-video-3`.
    pub fn id_prefix(self) -> &'static str {
        match self {
            AssetKind::Audio => "asset-audio",
            AssetKind::Video => "asset-video",
            AssetKind::Image => "asset-image",
        }
    }
}

/// A media source known to the project. One per `(kind, url)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Whether this asset is the one registered for `(kind, url)`.
    pub fn matches(&self, kind: AssetKind, url: &str) -> bool {
        self.kind == kind && self.url == url
    }
}

/// Find the asset registered for `(kind, url)`.
pub fn find<'a>(assets: &'a [Asset], kind: AssetKind, url: &str) -> Option<&'a Asset> {
    assets.iter().find(|asset| asset.matches(kind, url))
}
