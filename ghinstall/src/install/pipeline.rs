//! End-to-end installation of a release asset.
//!
//! The pipeline is strictly sequential:
//! fetch release → select assets → download main asset → download checksum
//! manifest → verify → make executable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::destination::{checksum_path, Destination, DestinationPolicy, CURRENT_DIR};
use crate::download::{AssetDownloader, DownloadProgress, DownloadedFile, NoProgress};
use crate::error::{InstallError, InstallResult};
use crate::hash::{ChecksumAlgorithm, DEFAULT_ALGORITHM};
use crate::platform::{PackageFamily, PlatformMatcher};
use crate::reference::{RepositoryReference, VersionSelector};
use crate::release::{log_rate_limit, AssetSelector, Release, ReleaseSource, SelectionResult};
use crate::verify::verify;

/// Callback for stage updates.
pub type StageCallback = Box<dyn Fn(InstallStage, &str) + Send + Sync>;

/// Installation stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Looking up the release.
    FetchingRelease,
    /// Choosing the asset for this platform.
    SelectingAsset,
    /// Downloading the main asset.
    Downloading,
    /// Downloading the checksum manifest.
    DownloadingChecksum,
    /// Comparing digests.
    Verifying,
    /// Setting permissions on the installed file.
    Installing,
    /// Installation complete.
    Complete,
}

impl InstallStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchingRelease => "Fetching release",
            Self::SelectingAsset => "Selecting asset",
            Self::Downloading => "Downloading",
            Self::DownloadingChecksum => "Downloading checksum",
            Self::Verifying => "Verifying",
            Self::Installing => "Installing",
            Self::Complete => "Complete",
        }
    }
}

/// Integrity outcome of an installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched the published one.
    Verified {
        algorithm: ChecksumAlgorithm,
        digest: String,
    },
    /// A manifest existed but could not be used.
    Unverified { reason: String },
    /// The release publishes no checksum manifest.
    NoManifest,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// Result of a successful installation.
#[derive(Debug, Clone)]
pub struct InstalledAsset {
    /// Asset name as published in the release.
    pub name: String,
    /// Where the asset was written.
    pub path: PathBuf,
    /// MIME type reported by the release, if any.
    pub content_type: Option<String>,
    /// Tag of the release the asset came from.
    pub tag: String,
    /// Set when the asset is a system package left for the user to install.
    pub system_package: Option<PackageFamily>,
    pub verification: Verification,
}

/// Settings for [`Installer`].
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Default install directory for raw binaries.
    pub bin_dir: PathBuf,
    /// Directory checksum manifests are downloaded to.
    pub checksum_dir: PathBuf,
    /// Algorithm for manifests that do not name one.
    pub default_algorithm: ChecksumAlgorithm,
    /// Delete the downloaded asset when its digest does not match.
    pub delete_on_mismatch: bool,
    /// Parent of the per-invocation system package directories. `None`
    /// uses the system temporary directory.
    pub package_dir: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from(CURRENT_DIR),
            checksum_dir: PathBuf::from(CURRENT_DIR),
            default_algorithm: DEFAULT_ALGORITHM,
            delete_on_mismatch: true,
            package_dir: None,
        }
    }
}

impl InstallerConfig {
    /// Set the default install directory.
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    /// Set the directory checksum manifests are saved to.
    pub fn with_checksum_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checksum_dir = dir.into();
        self
    }

    /// Set the fallback checksum algorithm.
    pub fn with_default_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Choose whether a mismatching asset is deleted.
    pub fn with_delete_on_mismatch(mut self, delete: bool) -> Self {
        self.delete_on_mismatch = delete;
        self
    }

    /// Create system package directories under `dir`.
    pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = Some(dir.into());
        self
    }
}

/// Per-invocation overrides, typically from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// File name for the installed binary.
    pub bin_name: Option<String>,
    /// Directory for the installed binary; `.` is the working directory.
    pub install_dir: Option<PathBuf>,
    /// Checksum algorithm overriding the manifest's.
    pub algorithm: Option<String>,
}

/// Installs release assets from a [`ReleaseSource`].
pub struct Installer<S: ReleaseSource> {
    source: S,
    config: InstallerConfig,
    matcher: PlatformMatcher,
    package_family: Option<PackageFamily>,
    progress: Box<dyn DownloadProgress>,
    cancel: CancellationToken,
}

impl<S: ReleaseSource> Installer<S> {
    /// Create an installer for the running host.
    pub fn new(source: S, config: InstallerConfig) -> Self {
        Self {
            source,
            config,
            matcher: PlatformMatcher::for_current_host(),
            package_family: PackageFamily::detect(),
            progress: Box::new(NoProgress),
            cancel: CancellationToken::new(),
        }
    }

    /// Match assets with this matcher instead of the host's.
    pub fn with_matcher(mut self, matcher: PlatformMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Prefer packages of this family instead of the detected one.
    pub fn with_package_family(mut self, family: Option<PackageFamily>) -> Self {
        self.package_family = family;
        self
    }

    /// Report download bytes to `progress`.
    pub fn with_progress(mut self, progress: Box<dyn DownloadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Abort downloads when `cancel` is triggered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the release source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Install the asset matching this host from the referenced release.
    ///
    /// # Errors
    ///
    /// Any lookup, selection or download failure, and a checksum mismatch.
    /// A checksum manifest that cannot be downloaded or used is not an
    /// error: the asset is kept and reported as [`Verification::Unverified`].
    pub fn install(
        &self,
        reference: &RepositoryReference,
        options: &InstallOptions,
        on_stage: Option<StageCallback>,
    ) -> InstallResult<InstalledAsset> {
        let report = |stage: InstallStage, message: &str| {
            if let Some(ref cb) = on_stage {
                cb(stage, message);
            }
        };

        let algorithm_override = options.algorithm.as_deref().filter(|a| !a.is_empty());
        if let Some(name) = algorithm_override {
            name.parse::<ChecksumAlgorithm>()?;
        }

        // Stage 1: Look up the release
        report(
            InstallStage::FetchingRelease,
            &format!("Fetching {} release of {}", reference.version, reference.slug()),
        );
        log_rate_limit(&self.source);
        let release = self.fetch_release(reference)?;
        self.check_cancelled(&reference.slug())?;
        let tag = match release.tag() {
            "" => reference.version.to_string(),
            tag => tag.to_string(),
        };
        info!(repo = %reference.slug(), tag = %tag, assets = release.assets.len(), "Found release");

        if release.assets.is_empty() {
            return Err(InstallError::NoAssets { tag });
        }

        // Stage 2: Pick the platform asset and manifest
        report(InstallStage::SelectingAsset, "Selecting asset for this platform");
        let selection = AssetSelector::new(&self.matcher)
            .with_package_family(self.package_family)
            .select(&release.assets, &tag)?;
        let main = &selection.main_asset;

        let policy = DestinationPolicy::new(&self.config.bin_dir)
            .with_bin_name(options.bin_name.clone())
            .with_install_dir(options.install_dir.clone())
            .with_package_root(self.config.package_dir.clone());
        let destination = policy.resolve(main.name())?;

        let (downloaded, verification) =
            match self.deliver(reference, &selection, &destination, algorithm_override, &report) {
                Ok(delivered) => delivered,
                Err(e) => {
                    let keep_mismatch = e.is_integrity_failure() && !self.config.delete_on_mismatch;
                    if let (Destination::SystemPackage { path, .. }, false) = (&destination, keep_mismatch) {
                        if let Some(dir) = path.parent() {
                            remove_dir_quietly(dir);
                        }
                    }
                    return Err(e);
                }
            };

        report(InstallStage::Complete, "Installation complete");
        info!(
            asset = main.name(),
            path = %downloaded.local_path.display(),
            verified = verification.is_verified(),
            "Successfully installed"
        );

        let system_package = match destination {
            Destination::SystemPackage { family, .. } => Some(family),
            Destination::Binary { .. } => None,
        };

        Ok(InstalledAsset {
            name: downloaded.original_name,
            path: downloaded.local_path,
            content_type: main.content_type.clone(),
            tag,
            system_package,
            verification,
        })
    }

    /// Download, verify and set up the selected asset at `destination`.
    fn deliver(
        &self,
        reference: &RepositoryReference,
        selection: &SelectionResult,
        destination: &Destination,
        algorithm_override: Option<&str>,
        report: &dyn Fn(InstallStage, &str),
    ) -> InstallResult<(DownloadedFile, Verification)> {
        let main = &selection.main_asset;
        let downloader = AssetDownloader::new(&self.source, &reference.owner, &reference.repo)
            .with_progress(self.progress.as_ref())
            .with_cancellation(self.cancel.clone());

        // Stage 3: Download the main asset
        report(InstallStage::Downloading, main.name());
        let downloaded = downloader.download_and_save(main, destination.path())?;

        // Stage 4: Verify against the manifest, if any
        let verification = match &selection.checksum_asset {
            None => Verification::NoManifest,
            Some(manifest) => {
                report(InstallStage::DownloadingChecksum, manifest.name());
                let manifest_path = checksum_path(&self.config.checksum_dir, manifest.name());
                match downloader.download_and_save(manifest, &manifest_path) {
                    Err(e @ InstallError::Cancelled { .. }) => {
                        remove_quietly(&downloaded.local_path);
                        return Err(e);
                    }
                    Err(e) => {
                        error!(
                            manifest = manifest.name(),
                            error = %e,
                            "Failed to download checksum file, verification will be skipped"
                        );
                        warn!(
                            asset = main.name(),
                            path = %downloaded.local_path.display(),
                            "Integrity of the download is NOT confirmed"
                        );
                        Verification::Unverified {
                            reason: e.to_string(),
                        }
                    }
                    Ok(saved) => {
                        if let Err(e) = self.check_cancelled(main.name()) {
                            remove_quietly(&downloaded.local_path);
                            remove_quietly(&saved.local_path);
                            return Err(e);
                        }
                        report(InstallStage::Verifying, main.name());
                        self.verify_download(
                            &downloaded.local_path,
                            main.name(),
                            &saved.local_path,
                            algorithm_override,
                        )?
                    }
                }
            }
        };

        // Stage 5: Make raw binaries executable
        if let Destination::Binary { path } = destination {
            report(InstallStage::Installing, &path.display().to_string());
            make_executable(path)?;
        }

        Ok((downloaded, verification))
    }

    /// Stop between stages once cancellation has been requested.
    fn check_cancelled(&self, asset: &str) -> InstallResult<()> {
        if self.cancel.is_cancelled() {
            warn!(asset, "Installation cancelled");
            return Err(InstallError::Cancelled {
                asset: asset.to_string(),
            });
        }
        Ok(())
    }

    fn fetch_release(&self, reference: &RepositoryReference) -> InstallResult<Release> {
        match &reference.version {
            VersionSelector::Latest => {
                debug!(repo = %reference.slug(), "Fetching latest release");
                self.source.latest_release(&reference.owner, &reference.repo)
            }
            VersionSelector::Tag(tag) => {
                debug!(repo = %reference.slug(), tag = %tag, "Fetching release by tag");
                self.source
                    .release_by_tag(&reference.owner, &reference.repo, tag)
            }
        }
    }

    /// Apply the mismatch and unavailable-manifest policies around [`verify`].
    fn verify_download(
        &self,
        main_path: &Path,
        original_name: &str,
        manifest_path: &Path,
        algorithm_override: Option<&str>,
    ) -> InstallResult<Verification> {
        let result = verify(
            main_path,
            original_name,
            manifest_path,
            algorithm_override,
            self.config.default_algorithm,
        );

        match result {
            Ok(verified) => Ok(Verification::Verified {
                algorithm: verified.algorithm,
                digest: verified.digest,
            }),
            Err(e) if e.is_verification_unavailable() => {
                warn!(
                    asset = original_name,
                    path = %main_path.display(),
                    "Keeping download, integrity is NOT confirmed"
                );
                remove_quietly(manifest_path);
                Ok(Verification::Unverified {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                if e.is_integrity_failure() && self.config.delete_on_mismatch {
                    warn!(path = %main_path.display(), "Deleting download that failed verification");
                    remove_quietly(main_path);
                }
                remove_quietly(manifest_path);
                Err(e)
            }
        }
    }
}

fn remove_dir_quietly(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = %dir.display(), "Removed temporary directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove temporary directory"),
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Add the executable bits to a file.
#[cfg(unix)]
fn make_executable(path: &Path) -> InstallResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| InstallError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(|e| InstallError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "Made file executable");
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> InstallResult<()> {
    Ok(())
}
