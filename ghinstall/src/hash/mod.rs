//! Digest computation and checksum manifest handling.
//!
//! - `algorithm`: supported algorithms and streaming file hashing
//! - `manifest`: manifest name recognition and `<digest> <file>` parsing

mod algorithm;
mod manifest;

pub use algorithm::{hash_file, hasher, ChecksumAlgorithm, StreamingHasher, DEFAULT_ALGORITHM};
pub use manifest::{algorithm_from_filename, is_checksum_manifest_name, parse_checksum_manifest};
