//! Host operating system and CPU architecture in release-naming vocabulary.
//!
//! Release assets are usually named with Go's `GOOS`/`GOARCH` values
//! (`darwin`, `amd64`, `arm64`), while Rust reports `macos`, `x86_64` and
//! `aarch64`. `HostPlatform` stores the canonical release name and
//! [`HostPlatform::arch_tokens`] expands it to the accepted synonyms.

use std::env::consts;
use std::fmt;

/// Operating system and architecture a release asset must target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    /// Canonical OS name (`linux`, `darwin`, `windows`, ...).
    pub os: String,
    /// Canonical architecture name (`amd64`, `386`, `arm64`, ...).
    pub arch: String,
}

impl HostPlatform {
    /// Create a platform from release-naming values, e.g. `("linux", "amd64")`.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into().to_lowercase(),
            arch: arch.into().to_lowercase(),
        }
    }

    /// Detect the platform this process runs on.
    pub fn current() -> Self {
        Self::new(canonical_os(consts::OS), canonical_arch(consts::ARCH))
    }

    /// OS names accepted in asset filenames.
    pub fn os_tokens(&self) -> Vec<&str> {
        match self.os.as_str() {
            "darwin" => vec!["darwin", "macos"],
            os => vec![os],
        }
    }

    /// OS names that rule an asset out even when the host's own OS token
    /// appears, e.g. `aarch64-linux-android` is not a Linux build.
    pub fn foreign_os_tokens(&self) -> Vec<&str> {
        match self.os.as_str() {
            "linux" => vec!["android"],
            _ => Vec::new(),
        }
    }

    /// Architecture names accepted in asset filenames.
    ///
    /// Only the listed synonym pairs are equivalent; `386` and `amd64` stay distinct.
    pub fn arch_tokens(&self) -> Vec<&str> {
        match self.arch.as_str() {
            "amd64" => vec!["amd64", "x86_64"],
            "386" => vec!["386", "i386"],
            "arm64" => vec!["arm64", "aarch64"],
            arch => vec![arch],
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn canonical_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn canonical_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}
