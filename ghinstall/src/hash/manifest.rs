//! Checksum manifest recognition and parsing.
//!
//! Manifests come in two shapes:
//! - Generic lists such as `checksums.txt` or `SHA256SUMS` holding one
//!   `<digest>  <filename>` line per release asset.
//! - Per-asset files named after their algorithm, e.g. `tool.tar.gz.sha256`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::algorithm::ChecksumAlgorithm;
use crate::error::{InstallError, InstallResult};

fn manifest_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)(^(sha\d*sums?(\.txt)?|md5sums?(\.txt)?|checksums\.txt)$|checksums?(\.txt)?)",
        )
        .expect("manifest name pattern is valid")
    })
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}

/// Last extension of the base name including the dot, lowercased.
fn extension(filename: &str) -> Option<String> {
    let name = base_name(filename);
    name.rfind('.').map(|idx| name[idx..].to_ascii_lowercase())
}

/// Derive the algorithm from an algorithm-suffix extension such as `.sha256`.
///
/// Returns `None` for generic manifest names like `checksums.txt`.
pub fn algorithm_from_filename(filename: &str) -> Option<ChecksumAlgorithm> {
    let ext = extension(filename)?;
    ChecksumAlgorithm::ALL
        .into_iter()
        .find(|algorithm| ext.strip_prefix('.') == Some(algorithm.name()))
}

/// Whether a release asset name denotes a checksum manifest.
pub fn is_checksum_manifest_name(filename: &str) -> bool {
    manifest_name_regex().is_match(base_name(filename))
        || algorithm_from_filename(filename).is_some()
}

/// Find the expected digest for `target_filename` in a manifest file.
///
/// Blank lines and `#` comments are skipped, as are lines with fewer than two
/// fields. The first field is the digest and the last field the file name,
/// with a leading `*` (binary mode) and `./` removed. The first matching line wins.
///
/// # Errors
///
/// Returns [`InstallError::ReadFailed`] if the manifest cannot be read and
/// [`InstallError::EntryNotFound`] if no line names the target.
pub fn parse_checksum_manifest(path: &Path, target_filename: &str) -> InstallResult<String> {
    let file = File::open(path).map_err(|e| InstallError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Decoded lossily: a non-UTF-8 line must not end the scan.
    for raw in BufReader::new(file).split(b'\n') {
        let raw = raw.map_err(|e| InstallError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            debug!(line, "Skipping malformed checksum line");
            continue;
        }

        let digest = fields[0];
        let name = fields[fields.len() - 1];
        let name = name.strip_prefix('*').unwrap_or(name);
        let name = name.strip_prefix("./").unwrap_or(name);

        if name == target_filename {
            debug!(
                digest,
                target = target_filename,
                manifest = %path.display(),
                "Found expected checksum"
            );
            return Ok(digest.to_string());
        }
    }

    Err(InstallError::EntryNotFound {
        target: target_filename.to_string(),
        manifest: path.to_path_buf(),
    })
}
