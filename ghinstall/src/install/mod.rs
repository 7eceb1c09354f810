//! Installation of release assets onto the local machine.
//!
//! - `naming`: install file names derived from asset names
//! - `destination`: install directory and system-package routing
//! - `pipeline`: the [`Installer`] running lookup, download and verification

mod destination;
mod naming;
mod pipeline;

pub use destination::{checksum_path, Destination, DestinationPolicy, CURRENT_DIR};
pub use naming::derive_binary_name;
pub use pipeline::{
    InstallOptions, InstallStage, InstalledAsset, Installer, InstallerConfig, StageCallback,
    Verification,
};
