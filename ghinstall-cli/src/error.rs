//! CLI error type.

use ghinstall::InstallError;
use thiserror::Error;

/// Errors surfaced to the user by `gh-install`.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failure while resolving, downloading or verifying a release asset.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Configuration or environment problem.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the downloaded asset failed its checksum.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Install(e) if e.is_integrity_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_is_one() {
        let err = CliError::Config("bad".to_string());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_integrity_failure_passthrough() {
        let err: CliError = InstallError::ChecksumMismatch {
            asset: "tool".to_string(),
            algorithm: "sha256".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        }
        .into();
        assert!(err.is_integrity_failure());
        assert!(err.to_string().contains("checksum mismatch"));

        let other: CliError = InstallError::NoAssets {
            tag: "v1".to_string(),
        }
        .into();
        assert!(!other.is_integrity_failure());
    }
}
