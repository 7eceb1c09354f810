//! Verification of a downloaded asset against its checksum manifest.
//!
//! Verification runs in four steps:
//!
//! 1. Resolve the algorithm: an explicit override, else the manifest's
//!    algorithm extension (`.sha512`, `.md5`, ...), else the default.
//! 2. Look up the expected digest for the asset's original name.
//! 3. Hash the downloaded file.
//! 4. Compare the digests ignoring case.
//!
//! A manifest that cannot be read or does not list the asset yields
//! [`InstallError::VerificationUnavailable`]. Nothing is deleted on that path.
//! On success the manifest is removed.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::error::{InstallError, InstallResult};
use crate::hash::{algorithm_from_filename, hash_file, parse_checksum_manifest, ChecksumAlgorithm};

/// A successfully verified digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub algorithm: ChecksumAlgorithm,
    pub digest: String,
}

/// Pick the algorithm for a manifest.
///
/// # Errors
///
/// Returns [`InstallError::UnsupportedAlgorithm`] for an unknown override.
pub fn resolve_algorithm(
    checksum_path: &Path,
    algorithm_override: Option<&str>,
    default_algorithm: ChecksumAlgorithm,
) -> InstallResult<ChecksumAlgorithm> {
    if let Some(name) = algorithm_override.filter(|name| !name.is_empty()) {
        debug!(algorithm = name, "Using algorithm override");
        return name.parse();
    }

    let from_name = checksum_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(algorithm_from_filename);

    match from_name {
        Some(algorithm) => {
            debug!(%algorithm, "Determined algorithm from checksum file extension");
            Ok(algorithm)
        }
        None => {
            debug!(algorithm = %default_algorithm, "Using default algorithm");
            Ok(default_algorithm)
        }
    }
}

/// Verify `main_path` against the digest `checksum_path` lists for `original_name`.
///
/// # Errors
///
/// - [`InstallError::UnsupportedAlgorithm`] if the algorithm cannot be resolved
/// - [`InstallError::VerificationUnavailable`] if the manifest has no usable entry
/// - [`InstallError::ReadFailed`] if the downloaded file cannot be hashed
/// - [`InstallError::ChecksumMismatch`] if the digests differ
pub fn verify(
    main_path: &Path,
    original_name: &str,
    checksum_path: &Path,
    algorithm_override: Option<&str>,
    default_algorithm: ChecksumAlgorithm,
) -> InstallResult<Verified> {
    let algorithm = resolve_algorithm(checksum_path, algorithm_override, default_algorithm)?;

    let expected = parse_checksum_manifest(checksum_path, original_name).map_err(|e| {
        warn!(
            asset = original_name,
            manifest = %checksum_path.display(),
            error = %e,
            "Checksum verification unavailable, integrity of the download is unconfirmed"
        );
        InstallError::VerificationUnavailable {
            asset: original_name.to_string(),
            manifest: checksum_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let actual = hash_file(main_path, algorithm.name())?;

    if !actual.eq_ignore_ascii_case(&expected) {
        error!(
            asset = original_name,
            %algorithm,
            expected = %expected,
            actual = %actual,
            "Checksum mismatch"
        );
        return Err(InstallError::ChecksumMismatch {
            asset: original_name.to_string(),
            algorithm: algorithm.name().to_string(),
            expected,
            actual,
        });
    }

    info!(asset = original_name, %algorithm, "Checksum verified");
    match fs::remove_file(checksum_path) {
        Ok(()) => debug!(manifest = %checksum_path.display(), "Removed checksum file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            manifest = %checksum_path.display(),
            error = %e,
            "Failed to remove checksum file"
        ),
    }

    Ok(Verified {
        algorithm,
        digest: actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DEFAULT_ALGORITHM;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// sha256 of "hello world".
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_verify_success_removes_manifest() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        let manifest = write(
            &temp,
            "checksums.txt",
            format!("{}  tool\n", HELLO_SHA256).as_bytes(),
        );

        let verified = verify(&main, "tool", &manifest, None, DEFAULT_ALGORITHM).unwrap();

        assert_eq!(verified.algorithm, ChecksumAlgorithm::Sha256);
        assert_eq!(verified.digest, HELLO_SHA256);
        assert!(!manifest.exists(), "manifest is removed after success");
        assert!(main.exists());
    }

    #[test]
    fn test_verify_uses_original_name_not_local_path() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        let manifest = write(
            &temp,
            "checksums.txt",
            format!(
                "0000000000000000000000000000000000000000000000000000000000000000  tool\n{}  tool_1.0.0_linux_amd64\n",
                HELLO_SHA256
            )
            .as_bytes(),
        );

        let result = verify(&main, "tool_1.0.0_linux_amd64", &manifest, None, DEFAULT_ALGORITHM);
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        let manifest = write(
            &temp,
            "checksums.txt",
            format!("{}  tool\n", HELLO_SHA256.to_uppercase()).as_bytes(),
        );

        assert!(verify(&main, "tool", &manifest, None, DEFAULT_ALGORITHM).is_ok());
    }

    #[test]
    fn test_verify_mismatch() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"tampered content");
        let manifest = write(
            &temp,
            "checksums.txt",
            format!("{}  tool\n", HELLO_SHA256).as_bytes(),
        );

        match verify(&main, "tool", &manifest, None, DEFAULT_ALGORITHM) {
            Err(InstallError::ChecksumMismatch {
                asset,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(asset, "tool");
                assert_eq!(expected, HELLO_SHA256);
                assert_ne!(actual, HELLO_SHA256);
                assert_eq!(actual.len(), 64);
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
        assert!(main.exists(), "deletion is the caller's decision");
    }

    #[test]
    fn test_missing_entry_keeps_asset() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        let manifest = write(
            &temp,
            "checksums.txt",
            format!("{}  other-tool\n", HELLO_SHA256).as_bytes(),
        );

        let result = verify(&main, "tool", &manifest, None, DEFAULT_ALGORITHM);
        match result {
            Err(ref e @ InstallError::VerificationUnavailable { .. }) => {
                assert!(e.is_verification_unavailable());
                assert!(!e.is_integrity_failure());
            }
            other => panic!("Expected VerificationUnavailable, got {:?}", other),
        }
        assert!(main.exists());
        assert!(manifest.exists());
    }

    #[test]
    fn test_unreadable_manifest_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");

        let result = verify(
            &main,
            "tool",
            &temp.path().join("checksums.txt"),
            None,
            DEFAULT_ALGORITHM,
        );
        assert!(matches!(result, Err(InstallError::VerificationUnavailable { .. })));
        assert!(main.exists());
    }

    #[test]
    fn test_algorithm_from_manifest_extension() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        // md5 of "hello world".
        let manifest = write(
            &temp,
            "tool.md5",
            b"5eb63bbbe01eeed093cb22bb8f5acdc3  tool\n",
        );

        let verified = verify(&main, "tool", &manifest, None, DEFAULT_ALGORITHM).unwrap();
        assert_eq!(verified.algorithm, ChecksumAlgorithm::Md5);
    }

    #[test]
    fn test_unsupported_override_fails_before_reading() {
        let temp = TempDir::new().unwrap();
        let main = write(&temp, "tool", b"hello world");
        let manifest = temp.path().join("checksums.txt");

        let result = verify(&main, "tool", &manifest, Some("whirlpool"), DEFAULT_ALGORITHM);
        assert!(matches!(result, Err(InstallError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_resolve_algorithm_precedence() {
        let sha512 = Path::new("tool.sha512");
        let generic = Path::new("checksums.txt");

        assert_eq!(
            resolve_algorithm(sha512, Some("md5"), DEFAULT_ALGORITHM).unwrap(),
            ChecksumAlgorithm::Md5
        );
        assert_eq!(
            resolve_algorithm(sha512, Some(""), DEFAULT_ALGORITHM).unwrap(),
            ChecksumAlgorithm::Sha512
        );
        assert_eq!(
            resolve_algorithm(generic, None, ChecksumAlgorithm::Sha1).unwrap(),
            ChecksumAlgorithm::Sha1
        );
    }
}
