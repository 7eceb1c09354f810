//! Digest algorithms accepted in release checksum manifests.
//!
//! The set mirrors what GoReleaser publishes: the SHA-2 and SHA-3 families,
//! BLAKE2b-512, BLAKE2s-256, MD5, SHA-1 and CRC-32 (IEEE).

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use blake2::{Blake2b512, Blake2s256};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Buffer size for reading files during hashing (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Algorithm used for generic manifests such as `checksums.txt`.
pub const DEFAULT_ALGORITHM: ChecksumAlgorithm = ChecksumAlgorithm::Sha256;

/// A supported checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Blake2b,
    Blake2s,
    Crc32,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl ChecksumAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [ChecksumAlgorithm; 13] = [
        Self::Blake2b,
        Self::Blake2s,
        Self::Crc32,
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    /// Canonical lowercase name, which is also the manifest file extension.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blake2b => "blake2b",
            Self::Blake2s => "blake2s",
            Self::Crc32 => "crc32",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
        }
    }

    /// Look up an algorithm by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(name))
    }

    /// Create a fresh streaming digest context.
    pub fn hasher(&self) -> Box<dyn StreamingHasher> {
        match self {
            Self::Blake2b => Box::new(DigestHasher(Blake2b512::new())),
            Self::Blake2s => Box::new(DigestHasher(Blake2s256::new())),
            Self::Crc32 => Box::new(Crc32Hasher(crc32fast::Hasher::new())),
            Self::Md5 => Box::new(DigestHasher(Md5::new())),
            Self::Sha1 => Box::new(DigestHasher(Sha1::new())),
            Self::Sha224 => Box::new(DigestHasher(Sha224::new())),
            Self::Sha256 => Box::new(DigestHasher(Sha256::new())),
            Self::Sha384 => Box::new(DigestHasher(Sha384::new())),
            Self::Sha512 => Box::new(DigestHasher(Sha512::new())),
            Self::Sha3_224 => Box::new(DigestHasher(Sha3_224::new())),
            Self::Sha3_256 => Box::new(DigestHasher(Sha3_256::new())),
            Self::Sha3_384 => Box::new(DigestHasher(Sha3_384::new())),
            Self::Sha3_512 => Box::new(DigestHasher(Sha3_512::new())),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| InstallError::UnsupportedAlgorithm(s.to_string()))
    }
}

/// Incremental digest computation over a byte stream.
pub trait StreamingHasher: Send {
    /// Feed more bytes into the digest.
    fn update(&mut self, data: &[u8]);

    /// Consume the context and return the lowercase hex digest.
    fn finalize_hex(self: Box<Self>) -> String;
}

struct DigestHasher<D>(D);

impl<D: Digest + Send> StreamingHasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

struct Crc32Hasher(crc32fast::Hasher);

impl StreamingHasher for Crc32Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        // Big-endian, matching the `crc32` extension GoReleaser writes.
        format!("{:08x}", self.0.finalize())
    }
}

/// Create a digest context for an algorithm given by name.
///
/// # Errors
///
/// Returns [`InstallError::UnsupportedAlgorithm`] for unknown names.
pub fn hasher(algorithm: &str) -> InstallResult<Box<dyn StreamingHasher>> {
    let algorithm: ChecksumAlgorithm = algorithm.parse()?;
    Ok(algorithm.hasher())
}

/// Calculate the checksum of a file with the named algorithm.
///
/// # Returns
///
/// The lowercase hexadecimal digest of the file contents.
///
/// # Errors
///
/// Returns an error if the algorithm is unknown or the file cannot be read.
pub fn hash_file(path: &Path, algorithm: &str) -> InstallResult<String> {
    let mut hasher = hasher(algorithm)?;

    let mut file = File::open(path).map_err(|e| InstallError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| InstallError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    let digest = hasher.finalize_hex();
    debug!(
        algorithm,
        path = %path.display(),
        digest = %digest,
        "Calculated file checksum"
    );
    Ok(digest)
}
