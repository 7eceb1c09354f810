//! Host platform detection and asset filename matching.

mod host;
mod matcher;
mod package_family;

pub use host::HostPlatform;
pub use matcher::PlatformMatcher;
pub use package_family::PackageFamily;
