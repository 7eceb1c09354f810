//! gh-install - install binaries published as GitHub release assets
//!
//! This library resolves a repository release, picks the asset built for the
//! running OS and architecture, downloads it, and verifies it against the
//! checksum manifest published alongside it.
//!
//! # Example
//!
//! ```no_run
//! use ghinstall::config::ConfigFile;
//! use ghinstall::install::{InstallOptions, Installer};
//! use ghinstall::release::GitHubClient;
//!
//! let config = ConfigFile::load()?;
//! let client = GitHubClient::new(config.github_config())?;
//! let installer = Installer::new(client, config.installer_config());
//!
//! let reference = ghinstall::reference::parse("cli/cli@v2.40.0")?;
//! let installed = installer.install(&reference, &InstallOptions::default(), None)?;
//! println!("installed {}", installed.path.display());
//! # Ok::<(), ghinstall::error::InstallError>(())
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod hash;
pub mod install;
pub mod platform;
pub mod reference;
pub mod release;
pub mod verify;

pub use error::{InstallError, InstallResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
