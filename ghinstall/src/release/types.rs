//! Release metadata as returned by the GitHub REST API.

use std::fmt;
use std::io::Read;

use serde::Deserialize;

/// A published release and its downloadable files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// The release tag, or an empty string when the API omitted it.
    pub fn tag(&self) -> &str {
        self.tag_name.as_deref().unwrap_or_default()
    }
}

/// A single file attached to a release.
///
/// Fields are optional because entries missing a name or id have to be
/// detected and skipped rather than rejected during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, rename = "size")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ReleaseAsset {
    /// Create a fully populated asset.
    pub fn new(name: impl Into<String>, id: u64, size_bytes: u64) -> Self {
        Self {
            name: Some(name.into()),
            id: Some(id),
            size_bytes: Some(size_bytes),
            content_type: Some("application/octet-stream".to_string()),
        }
    }

    /// The asset name, or an empty string when absent.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Whether the entry has the name and id needed to be considered at all.
    pub fn is_valid(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty()) && self.id.is_some()
    }
}

/// Result of requesting an asset's bytes.
pub enum AssetStream {
    /// The asset content.
    Bytes(Box<dyn Read + Send>),
    /// The server only returned a location to fetch the content from.
    Redirect(String),
}

impl fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(_) => f.write_str("AssetStream::Bytes(..)"),
            Self::Redirect(location) => write!(f, "AssetStream::Redirect({})", location),
        }
    }
}

/// API rate limit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp at which the window resets.
    pub reset: i64,
}
