//! Integration tests for the install pipeline.
//!
//! These tests drive the complete flow against an in-memory release source:
//! - Release lookup → asset selection → download → verification
//! - Cleanup of partial downloads and mismatching binaries
//! - System package routing and the installed-binaries manifest
//!
//! Run with: `cargo test --test install_pipeline`

use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use ghinstall::config::{InstalledBinary, InstalledManifest};
use ghinstall::error::{InstallError, InstallResult};
use ghinstall::install::{InstallOptions, Installer, InstallerConfig, Verification};
use ghinstall::platform::{HostPlatform, PackageFamily, PlatformMatcher};
use ghinstall::reference::{self, RepositoryReference};
use ghinstall::release::{AssetStream, Release, ReleaseAsset, ReleaseSource};

// ============================================================================
// Helper Functions
// ============================================================================

/// sha256 of "hello world".
const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

/// How the fake source serves one asset.
#[derive(Clone)]
enum Blob {
    Bytes(Vec<u8>),
    /// Serve these bytes, then fail the read.
    Truncated(Vec<u8>),
    Redirect(String),
}

/// Reader yielding a prefix and then a connection error.
struct TruncatedReader {
    data: Cursor<Vec<u8>>,
}

impl Read for TruncatedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection dropped",
            )),
            n => Ok(n),
        }
    }
}

/// In-memory stand-in for the GitHub API.
struct FakeReleases {
    releases: Vec<Release>,
    blobs: HashMap<u64, Blob>,
    next_id: u64,
}

impl FakeReleases {
    fn new() -> Self {
        Self {
            releases: Vec::new(),
            blobs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Start a new release; it becomes the latest.
    fn release(mut self, tag: &str) -> Self {
        self.releases.push(Release {
            tag_name: Some(tag.to_string()),
            assets: Vec::new(),
        });
        self
    }

    fn asset(mut self, name: &str, blob: Blob) -> Self {
        let id = self.next_id;
        self.next_id += 1;
        let size = match &blob {
            Blob::Bytes(b) | Blob::Truncated(b) => b.len() as u64,
            Blob::Redirect(_) => 0,
        };
        self.releases
            .last_mut()
            .expect("call release() first")
            .assets
            .push(ReleaseAsset::new(name, id, size));
        self.blobs.insert(id, blob);
        self
    }

    fn bytes(self, name: &str, content: &[u8]) -> Self {
        self.asset(name, Blob::Bytes(content.to_vec()))
    }
}

impl ReleaseSource for FakeReleases {
    fn latest_release(&self, owner: &str, repo: &str) -> InstallResult<Release> {
        self.releases
            .last()
            .cloned()
            .ok_or_else(|| InstallError::ReleaseNotFound {
                what: format!("repository {}/{} or its latest release", owner, repo),
            })
    }

    fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> InstallResult<Release> {
        self.releases
            .iter()
            .find(|r| r.tag() == tag)
            .cloned()
            .ok_or_else(|| InstallError::ReleaseNotFound {
                what: format!("release with tag '{}' in {}/{}", tag, owner, repo),
            })
    }

    fn download_asset(&self, _owner: &str, _repo: &str, asset_id: u64) -> InstallResult<AssetStream> {
        match self.blobs.get(&asset_id).cloned() {
            Some(Blob::Bytes(data)) => Ok(AssetStream::Bytes(Box::new(Cursor::new(data)))),
            Some(Blob::Truncated(data)) => Ok(AssetStream::Bytes(Box::new(TruncatedReader {
                data: Cursor::new(data),
            }))),
            Some(Blob::Redirect(location)) => Ok(AssetStream::Redirect(location)),
            None => Err(InstallError::Http(format!("unknown asset {}", asset_id))),
        }
    }
}

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn bin_dir(&self) -> std::path::PathBuf {
        self.temp.path().join("bin")
    }

    fn checksum_dir(&self) -> &Path {
        self.temp.path()
    }

    fn config(&self) -> InstallerConfig {
        InstallerConfig::default()
            .with_bin_dir(self.bin_dir())
            .with_checksum_dir(self.checksum_dir())
    }

    fn installer(&self, source: FakeReleases) -> Installer<FakeReleases> {
        linux_amd64(Installer::new(source, self.config()))
    }
}

fn linux_amd64(installer: Installer<FakeReleases>) -> Installer<FakeReleases> {
    installer
        .with_matcher(PlatformMatcher::new(&HostPlatform::new("linux", "amd64")))
        .with_package_family(None)
}

fn parse(input: &str) -> RepositoryReference {
    reference::parse(input).unwrap()
}

fn goreleaser_manifest(entries: &[(&str, &str)]) -> Vec<u8> {
    entries
        .iter()
        .map(|(digest, name)| format!("{}  {}\n", digest, name))
        .collect::<String>()
        .into_bytes()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Latest release, GoReleaser-style assets, verified and made executable.
#[test]
fn test_latest_release_verified_install() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v0.9.0")
        .bytes("tool_0.9.0_linux_amd64", b"old")
        .release("v1.0.0")
        .bytes("tool_1.0.0_darwin_amd64", b"mac")
        .bytes("tool_1.0.0_linux_arm64", b"arm")
        .bytes("tool_1.0.0_linux_amd64", b"hello world")
        .bytes("tool_1.0.0_windows_amd64.exe", b"win")
        .bytes(
            "tool_1.0.0_checksums.txt",
            &goreleaser_manifest(&[
                ("0000000000000000000000000000000000000000000000000000000000000000", "tool_1.0.0_darwin_amd64"),
                (HELLO_SHA256, "tool_1.0.0_linux_amd64"),
            ]),
        );

    let installed = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap();

    assert_eq!(installed.tag, "v1.0.0");
    assert_eq!(installed.name, "tool_1.0.0_linux_amd64");
    assert_eq!(installed.path, ws.bin_dir().join("tool"));
    assert_eq!(fs::read(&installed.path).unwrap(), b"hello world");
    assert_eq!(
        installed.verification,
        Verification::Verified {
            algorithm: ghinstall::hash::ChecksumAlgorithm::Sha256,
            digest: HELLO_SHA256.to_string(),
        }
    );
    assert!(
        !ws.checksum_dir().join("tool_1.0.0_checksums.txt").exists(),
        "manifest removed after successful verification"
    );
}

/// An explicit tag installs that release, not the latest.
#[test]
fn test_tagged_release_install() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v0.9.0")
        .bytes("tool_0.9.0_linux_x86_64", b"old")
        .release("v1.0.0")
        .bytes("tool_1.0.0_linux_x86_64", b"new");

    let installed = ws
        .installer(source)
        .install(&parse("owner/tool@v0.9.0"), &InstallOptions::default(), None)
        .unwrap();

    assert_eq!(installed.tag, "v0.9.0");
    assert_eq!(fs::read(&installed.path).unwrap(), b"old");
    assert_eq!(installed.verification, Verification::NoManifest);
}

/// A stream failing mid-copy leaves no file behind.
#[test]
fn test_interrupted_download_leaves_no_file() {
    let ws = Workspace::new();
    let source = FakeReleases::new().release("v1.0.0").asset(
        "tool_linux_amd64",
        Blob::Truncated(vec![7u8; 200 * 1024]),
    );

    let result = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None);

    match result {
        Err(InstallError::DownloadIncomplete { path, .. }) => {
            assert_eq!(path, ws.bin_dir().join("tool"));
            assert!(!path.exists());
        }
        other => panic!("Expected DownloadIncomplete, got {:?}", other),
    }
}

/// A tampered binary is deleted and the mismatch reported.
#[test]
fn test_tampered_binary_is_deleted() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_linux_amd64", b"evil payload")
        .bytes(
            "checksums.txt",
            &goreleaser_manifest(&[(HELLO_SHA256, "tool_linux_amd64")]),
        );

    let err = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap_err();

    assert!(err.is_integrity_failure());
    match err {
        InstallError::ChecksumMismatch {
            asset,
            expected,
            actual,
            ..
        } => {
            assert_eq!(asset, "tool_linux_amd64");
            assert_eq!(expected, HELLO_SHA256);
            assert_ne!(actual, expected);
        }
        other => panic!("Expected ChecksumMismatch, got {:?}", other),
    }
    assert!(!ws.bin_dir().join("tool").exists());
}

/// A manifest that does not list the asset keeps the binary, unverified.
#[test]
fn test_manifest_without_entry_keeps_binary() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_linux_amd64", b"hello world")
        .bytes(
            "SHA256SUMS",
            &goreleaser_manifest(&[(HELLO_SHA256, "tool_darwin_amd64")]),
        );

    let installed = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap();

    assert!(matches!(installed.verification, Verification::Unverified { .. }));
    assert!(installed.path.exists());
}

/// A checksum download that fails does not abort the install.
#[test]
fn test_checksum_download_failure_keeps_binary() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_linux_amd64", b"hello world")
        .asset(
            "checksums.txt",
            Blob::Redirect("https://objects.example.com/checksums.txt".to_string()),
        );

    let installed = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap();

    assert!(matches!(installed.verification, Verification::Unverified { .. }));
    assert_eq!(fs::read(&installed.path).unwrap(), b"hello world");
}

/// Per-asset manifests pick their algorithm from the extension.
#[test]
fn test_per_asset_sha512_manifest() {
    let ws = Workspace::new();
    // sha512 of "hello world".
    let sha512 = "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86f989dd35bc5ff499670da34255b45b0cfd830e81f605dcf7dc5542e93ae9cd76f";
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool-linux-amd64", b"hello world")
        .bytes(
            "tool-linux-amd64.sha512",
            format!("{} *tool-linux-amd64\n", sha512).as_bytes(),
        );

    let installed = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap();

    assert!(matches!(
        installed.verification,
        Verification::Verified {
            algorithm: ghinstall::hash::ChecksumAlgorithm::Sha512,
            ..
        }
    ));
}

/// Native system packages are preferred and parked in a temporary directory.
#[test]
fn test_system_package_routed_to_temp_dir() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_1.0.0_linux_amd64.tar.gz", b"archive")
        .bytes("tool_1.0.0_linux_amd64.deb", b"hello world")
        .bytes(
            "checksums.txt",
            &goreleaser_manifest(&[(HELLO_SHA256, "tool_1.0.0_linux_amd64.deb")]),
        );

    let installed = ws
        .installer(source)
        .with_package_family(Some(PackageFamily::Deb))
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap();

    assert_eq!(installed.system_package, Some(PackageFamily::Deb));
    assert_eq!(installed.name, "tool_1.0.0_linux_amd64.deb");
    assert!(!installed.path.starts_with(ws.bin_dir()));
    assert!(installed.path.exists());
    assert!(installed.verification.is_verified());

    fs::remove_dir_all(installed.path.parent().unwrap()).unwrap();
}

/// No asset for the platform is a terminal error naming the tag.
#[test]
fn test_no_asset_for_platform() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v3.1.4")
        .bytes("tool_darwin_arm64", b"mac")
        .bytes("tool_linux_386", b"x86")
        .bytes("checksums.txt", b"");

    let err = ws
        .installer(source)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap_err();

    match err {
        InstallError::NoSuitableAsset { tag, .. } => assert_eq!(tag, "v3.1.4"),
        other => panic!("Expected NoSuitableAsset, got {:?}", other),
    }
    assert!(!ws.bin_dir().join("tool").exists());
}

/// A cancelled install removes the partial file.
#[test]
fn test_cancelled_install() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_linux_amd64", b"hello world");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ws
        .installer(source)
        .with_cancellation(cancel)
        .install(&parse("owner/tool"), &InstallOptions::default(), None)
        .unwrap_err();

    assert!(matches!(err, InstallError::Cancelled { .. }));
    assert!(!ws.bin_dir().join("tool").exists());
}

/// A successful install can be recorded and read back.
#[test]
fn test_install_recorded_in_manifest() {
    let ws = Workspace::new();
    let source = FakeReleases::new()
        .release("v1.0.0")
        .bytes("tool_linux_amd64", b"hello world");
    let reference = parse("owner/tool");

    let installed = ws
        .installer(source)
        .install(&reference, &InstallOptions::default(), None)
        .unwrap();

    let manifest_path = ws.temp.path().join("data").join("installed.ini");
    let mut manifest = InstalledManifest::load(&manifest_path).unwrap();
    manifest.record(InstalledBinary {
        key: reference.slug(),
        name: "tool".to_string(),
        version: installed.tag.clone(),
        path: installed.path.clone(),
        installed_at: Utc::now(),
    });
    manifest.save().unwrap();

    let reloaded = InstalledManifest::load(&manifest_path).unwrap();
    let entry = reloaded.get("owner/tool").unwrap();
    assert_eq!(entry.version, "v1.0.0");
    assert_eq!(entry.path, installed.path);
}
