//! Selection of the main asset and checksum manifest from a release.
//!
//! A single pass over the asset list classifies every entry as a checksum
//! manifest, a platform match or unrelated:
//!
//! 1. Entries without a name or id are skipped.
//! 2. The first checksum manifest wins; later ones are ignored with a warning.
//! 3. Among platform matches, an asset carrying the host's native package
//!    extension (`.deb`, `.rpm`, `.apk`) replaces an earlier candidate that
//!    does not. Otherwise the first match wins.
//! 4. No platform match at all is an error; a missing manifest is not.

use tracing::{debug, info, warn};

use super::types::ReleaseAsset;
use crate::error::{InstallError, InstallResult};
use crate::hash::is_checksum_manifest_name;
use crate::platform::{PackageFamily, PlatformMatcher};

/// Outcome of scanning a release's assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// The binary or package to install.
    pub main_asset: ReleaseAsset,
    /// The manifest to verify it against, if the release has one.
    pub checksum_asset: Option<ReleaseAsset>,
}

/// Picks assets for the host platform.
#[derive(Debug, Clone)]
pub struct AssetSelector<'a> {
    matcher: &'a PlatformMatcher,
    package_family: Option<PackageFamily>,
}

impl<'a> AssetSelector<'a> {
    /// Create a selector using the given platform matcher.
    pub fn new(matcher: &'a PlatformMatcher) -> Self {
        Self {
            matcher,
            package_family: None,
        }
    }

    /// Prefer assets in this system package format among platform matches.
    pub fn with_package_family(mut self, family: Option<PackageFamily>) -> Self {
        self.package_family = family;
        self
    }

    /// Choose the main asset and optional checksum manifest.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NoSuitableAsset`] when no valid asset matches the platform.
    pub fn select(&self, assets: &[ReleaseAsset], tag: &str) -> InstallResult<SelectionResult> {
        debug!(
            count = assets.len(),
            "Scanning assets for platform binary and checksum file"
        );

        let mut main: Option<&ReleaseAsset> = None;
        let mut checksum: Option<&ReleaseAsset> = None;

        for asset in assets {
            if !asset.is_valid() {
                debug!(asset = ?asset, "Skipping asset with missing name or id");
                continue;
            }
            let name = asset.name();

            if is_checksum_manifest_name(name) {
                match checksum {
                    None => {
                        debug!(asset = name, "Found checksum file candidate");
                        checksum = Some(asset);
                    }
                    Some(kept) => warn!(
                        kept = kept.name(),
                        ignored = name,
                        "Found multiple checksum files, keeping the first"
                    ),
                }
                continue;
            }

            if !self.matcher.matches(name) {
                continue;
            }

            match main {
                None => {
                    debug!(asset = name, "Found main asset candidate");
                    main = Some(asset);
                }
                Some(kept) if self.is_native_package(name) && !self.is_native_package(kept.name()) => {
                    info!(
                        replaced = kept.name(),
                        preferred = name,
                        "Preferring native system package"
                    );
                    main = Some(asset);
                }
                Some(kept) => warn!(
                    kept = kept.name(),
                    ignored = name,
                    "Found multiple matching assets, keeping the first"
                ),
            }
        }

        let Some(main) = main else {
            return Err(InstallError::NoSuitableAsset {
                tag: tag.to_string(),
                platform: self.platform_hint(),
            });
        };

        info!(asset = main.name(), "Selected main asset");
        match checksum {
            Some(manifest) => info!(asset = manifest.name(), "Selected checksum file"),
            None => warn!("No checksum file found, proceeding without verification"),
        }

        Ok(SelectionResult {
            main_asset: main.clone(),
            checksum_asset: checksum.cloned(),
        })
    }

    fn is_native_package(&self, name: &str) -> bool {
        self.package_family.is_some() && PackageFamily::from_filename(name) == self.package_family
    }

    fn platform_hint(&self) -> String {
        match self.package_family {
            Some(family) => format!("this platform ({} packages)", family),
            None => "this platform".to_string(),
        }
    }
}
