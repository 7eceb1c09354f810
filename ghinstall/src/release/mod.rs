//! Release lookup and asset selection.
//!
//! - `types`: release and asset metadata
//! - `source`: the `ReleaseSource` lookup/download interface
//! - `github`: `ReleaseSource` backed by the GitHub REST API
//! - `selector`: picks the platform asset and checksum manifest

mod github;
mod selector;
mod source;
mod types;

pub use github::{log_rate_limit, GitHubClient, GitHubConfig, DEFAULT_API_URL};
pub use selector::{AssetSelector, SelectionResult};
pub use source::ReleaseSource;
pub use types::{AssetStream, RateLimit, Release, ReleaseAsset};
