//! Release lookup and asset download interface.

use crate::error::InstallResult;

use super::types::{AssetStream, RateLimit, Release};

/// Source of release metadata and asset bytes.
///
/// Implemented by [`GitHubClient`](super::GitHubClient) for the real API and by
/// in-memory fakes in tests.
pub trait ReleaseSource {
    /// Fetch the most recent published release.
    fn latest_release(&self, owner: &str, repo: &str) -> InstallResult<Release>;

    /// Fetch the release with the given tag.
    fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> InstallResult<Release>;

    /// Request the bytes of an asset.
    fn download_asset(&self, owner: &str, repo: &str, asset_id: u64) -> InstallResult<AssetStream>;

    /// Current API rate limit, if the source has one.
    fn rate_limit(&self) -> InstallResult<Option<RateLimit>> {
        Ok(None)
    }
}
