//! Native package format of the host Linux distribution.
//!
//! Detected from `/etc/os-release`: the `ID` and `ID_LIKE` fields are mapped
//! onto the distribution families that publish `.deb`, `.rpm` or `.apk` files.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

const OS_RELEASE: &str = "/etc/os-release";

/// A system package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFamily {
    /// Debian, Ubuntu and derivatives.
    Deb,
    /// RHEL, Fedora, CentOS, SUSE and derivatives.
    Rpm,
    /// Alpine.
    Apk,
}

impl PackageFamily {
    /// Every known package format.
    pub const ALL: [PackageFamily; 3] = [Self::Deb, Self::Rpm, Self::Apk];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
            Self::Apk => "apk",
        }
    }

    /// The package format a filename carries, if any.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::ALL
            .into_iter()
            .find(|family| family.extension().eq_ignore_ascii_case(ext))
    }

    /// Map a distribution identifier (`ID` / `ID_LIKE` entry) to its family.
    pub fn from_distribution(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" => Some(Self::Deb),
            "rhel" | "fedora" | "centos" | "suse" | "opensuse" | "sles" => Some(Self::Rpm),
            "alpine" => Some(Self::Apk),
            _ => None,
        }
    }

    /// Detect the family of the running system.
    ///
    /// Returns `None` on non-Linux hosts or unknown distributions.
    pub fn detect() -> Option<Self> {
        if !cfg!(target_os = "linux") {
            return None;
        }
        Self::detect_from(Path::new(OS_RELEASE))
    }

    /// Detect the family from an `os-release` formatted file.
    pub fn detect_from(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Could not read os-release");
                return None;
            }
        };
        let family = Self::from_os_release(&content);
        debug!(family = ?family, "Detected package family");
        family
    }

    /// Parse `os-release` content.
    pub fn from_os_release(content: &str) -> Option<Self> {
        let mut id = None;
        let mut id_like = None;

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            match key {
                "ID" => id = Some(value.to_lowercase()),
                "ID_LIKE" => id_like = Some(value.to_lowercase()),
                _ => {}
            }
        }

        id.iter()
            .chain(id_like.iter())
            .flat_map(|value| value.split_whitespace())
            .find_map(Self::from_distribution)
    }
}

impl fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
