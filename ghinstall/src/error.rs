//! Error types for release lookup, download and verification.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Errors that can occur while resolving, downloading or verifying a release asset.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The `owner/repo[@version]` argument is malformed.
    #[error("invalid argument format '{input}': {reason}")]
    InvalidArgumentFormat { input: String, reason: String },

    /// Repository or tag does not exist.
    #[error("{what} not found")]
    ReleaseNotFound { what: String },

    /// The GitHub API rate limit is exhausted.
    #[error("GitHub API rate limit exceeded (resets at {reset}); set GITHUB_TOKEN for a higher limit")]
    RateLimited { reset: String },

    /// GitHub answered with an unexpected status.
    #[error("GitHub API request to {url} failed with status {status}: {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The release exists but carries no assets at all.
    #[error("no assets found for release '{tag}'")]
    NoAssets { tag: String },

    /// No asset in the release matches the running OS/architecture.
    #[error("no suitable asset for {platform} found in release '{tag}'")]
    NoSuitableAsset { tag: String, platform: String },

    /// An asset entry lacks a required field.
    #[error("malformed asset: {reason}")]
    MalformedAsset { reason: String },

    /// The asset download produced a redirect locator instead of bytes.
    #[error("download of '{asset}' resulted in redirect to '{location}' instead of a data stream")]
    UnexpectedRedirect { asset: String, location: String },

    /// The byte copy failed partway; the partial file has been removed.
    #[error("download of '{asset}' to {} did not complete: {source}", path.display())]
    DownloadIncomplete {
        asset: String,
        path: PathBuf,
        source: io::Error,
    },

    /// The download was cancelled; the partial file has been removed.
    #[error("download of '{asset}' was cancelled")]
    Cancelled { asset: String },

    /// The requested or derived hash algorithm is not implemented.
    #[error("invalid or unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The checksum manifest does not list the target file.
    #[error("checksum for '{target}' not found in checksum file {}", manifest.display())]
    EntryNotFound { target: String, manifest: PathBuf },

    /// The checksum manifest could not be used to verify the asset.
    #[error("cannot verify '{asset}' against {}: {reason}", manifest.display())]
    VerificationUnavailable {
        asset: String,
        manifest: PathBuf,
        reason: String,
    },

    /// Computed digest disagrees with the published one.
    #[error("checksum mismatch for {asset} ({algorithm}): expected {expected}, got {actual}")]
    ChecksumMismatch {
        asset: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl InstallError {
    /// Whether this error means the downloaded bytes are known to be wrong.
    ///
    /// Only a digest mismatch qualifies. A manifest that cannot be used leaves
    /// the asset unverified, which callers report at a lower severity.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Whether this error leaves the downloaded asset in place but unverified.
    pub fn is_verification_unavailable(&self) -> bool {
        matches!(
            self,
            Self::VerificationUnavailable { .. } | Self::EntryNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for InstallError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}
