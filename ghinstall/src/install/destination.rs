//! Where downloaded assets are written.
//!
//! Raw binaries go to the install directory under their derived (or
//! overridden) name. System packages (`.deb`, `.rpm`, `.apk`) are not
//! installed by this tool, so they land in a fresh temporary directory that
//! is kept after the process exits.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::naming::derive_binary_name;
use crate::error::{InstallError, InstallResult};
use crate::platform::PackageFamily;

/// Directory token meaning "the current working directory".
pub const CURRENT_DIR: &str = ".";

/// Resolved location for a main asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// An executable placed in the install directory.
    Binary { path: PathBuf },
    /// A system package parked in a per-invocation temporary directory.
    SystemPackage {
        path: PathBuf,
        family: PackageFamily,
    },
}

impl Destination {
    /// Full path the asset is written to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Binary { path } | Self::SystemPackage { path, .. } => path,
        }
    }

    pub fn is_system_package(&self) -> bool {
        matches!(self, Self::SystemPackage { .. })
    }
}

/// Naming and directory rules for installed assets.
#[derive(Debug, Clone)]
pub struct DestinationPolicy {
    bin_name: Option<String>,
    install_dir: Option<PathBuf>,
    default_dir: PathBuf,
    package_root: Option<PathBuf>,
}

impl DestinationPolicy {
    /// Create a policy installing into `default_dir` unless overridden.
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_name: None,
            install_dir: None,
            default_dir: default_dir.into(),
            package_root: None,
        }
    }

    /// Use this file name instead of deriving one from the asset name.
    pub fn with_bin_name(mut self, name: Option<String>) -> Self {
        self.bin_name = name.filter(|n| !n.is_empty());
        self
    }

    /// Install into this directory instead of the default one.
    pub fn with_install_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.install_dir = dir.filter(|d| !d.as_os_str().is_empty());
        self
    }

    /// Create system package directories under `root` instead of the system
    /// temporary directory.
    pub fn with_package_root(mut self, root: Option<PathBuf>) -> Self {
        self.package_root = root;
        self
    }

    /// Directory raw binaries are written to.
    pub fn binary_dir(&self) -> &Path {
        self.install_dir.as_deref().unwrap_or(&self.default_dir)
    }

    /// File name a raw binary asset is installed under.
    pub fn binary_name<'a>(&'a self, asset_name: &'a str) -> &'a str {
        match &self.bin_name {
            Some(name) => name,
            None => derive_binary_name(asset_name),
        }
    }

    /// Resolve the destination for `asset_name`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::CreateDirFailed`] if the install or temporary
    /// directory cannot be created.
    pub fn resolve(&self, asset_name: &str) -> InstallResult<Destination> {
        if let Some(family) = PackageFamily::from_filename(asset_name) {
            let root = self.package_root.clone().unwrap_or_else(std::env::temp_dir);
            let dir = tempfile::Builder::new()
                .prefix("gh-install-")
                .tempdir_in(&root)
                .map_err(|e| InstallError::CreateDirFailed {
                    path: root.clone(),
                    source: e,
                })?
                .keep();
            let path = dir.join(asset_name);
            debug!(
                asset = asset_name,
                %family,
                path = %path.display(),
                "System package will be saved to temporary directory"
            );
            return Ok(Destination::SystemPackage { path, family });
        }

        let dir = self.binary_dir();
        if dir != Path::new(CURRENT_DIR) {
            fs::create_dir_all(dir).map_err(|e| InstallError::CreateDirFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let path = dir.join(self.binary_name(asset_name));
        debug!(asset = asset_name, path = %path.display(), "Main asset will be saved");
        Ok(Destination::Binary { path })
    }
}

/// Path a checksum manifest is saved to: its base name inside `dir`.
pub fn checksum_path(dir: &Path, asset_name: &str) -> PathBuf {
    let base = Path::new(asset_name)
        .file_name()
        .map(Path::new)
        .unwrap_or_else(|| Path::new(asset_name));
    dir.join(base)
}
