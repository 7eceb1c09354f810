//! Configuration file and installed-binaries manifest.
//!
//! Settings live in `~/.config/gh-install/config.ini`:
//!
//! ```ini
//! [install]
//! bin_dir = ~/.local/bin
//!
//! [checksum]
//! default_algorithm = sha256
//! delete_on_mismatch = true
//!
//! [github]
//! api_url = https://api.github.com
//! token = ghp_...
//! ```
//!
//! A missing file or key falls back to the defaults. The `GITHUB_TOKEN`
//! environment variable takes precedence over `[github] token`.
//!
//! Every installed binary is recorded in `~/.local/share/gh-install/installed.ini`
//! with one section per `owner/repo`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ini::Ini;
use tracing::{debug, warn};

use crate::error::{InstallError, InstallResult};
use crate::hash::{ChecksumAlgorithm, DEFAULT_ALGORITHM};
use crate::install::InstallerConfig;
use crate::release::{GitHubConfig, DEFAULT_API_URL};

/// Application directory name under the platform config and data dirs.
pub const APP_DIR: &str = "gh-install";

/// Environment variable holding a GitHub access token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const CONFIG_FILE: &str = "config.ini";
const MANIFEST_FILE: &str = "installed.ini";

/// Default configuration file location.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Default installed-binaries manifest location.
pub fn manifest_file_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join(MANIFEST_FILE))
}

/// Default directory for installed binaries.
///
/// `$XDG_BIN_HOME` when set, otherwise `~/.local/bin`.
pub fn default_bin_dir() -> PathBuf {
    dirs::executable_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("bin")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if value == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(value)),
        _ => PathBuf::from(value),
    }
}

fn parse_bool(key: &str, value: &str) -> InstallResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(InstallError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Settings loaded from `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub bin_dir: PathBuf,
    pub default_algorithm: ChecksumAlgorithm,
    pub delete_on_mismatch: bool,
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            default_algorithm: DEFAULT_ALGORITHM,
            delete_on_mismatch: true,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> InstallResult<Self> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Config`] for unparsable files or invalid values.
    pub fn load_from(path: &Path) -> InstallResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| {
            InstallError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Build settings from parsed ini content.
    pub fn from_ini(ini: &Ini) -> InstallResult<Self> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("install")) {
            if let Some(dir) = section.get("bin_dir").filter(|v| !v.trim().is_empty()) {
                config.bin_dir = expand_tilde(dir.trim());
            }
        }

        if let Some(section) = ini.section(Some("checksum")) {
            if let Some(name) = section.get("default_algorithm") {
                config.default_algorithm = name.trim().parse().map_err(|_| {
                    InstallError::Config(format!(
                        "checksum.default_algorithm '{}' is not a supported algorithm",
                        name
                    ))
                })?;
            }
            if let Some(value) = section.get("delete_on_mismatch") {
                config.delete_on_mismatch = parse_bool("checksum.delete_on_mismatch", value)?;
            }
        }

        if let Some(section) = ini.section(Some("github")) {
            if let Some(url) = section.get("api_url").filter(|v| !v.trim().is_empty()) {
                config.api_url = url.trim().trim_end_matches('/').to_string();
            }
            config.token = section
                .get("token")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
        }

        Ok(config)
    }

    /// Token to authenticate with: `GITHUB_TOKEN`, else the configured one.
    pub fn effective_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
    }

    /// GitHub client settings.
    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig::default()
            .with_api_url(&self.api_url)
            .with_token(self.effective_token())
    }

    /// Installer settings.
    pub fn installer_config(&self) -> InstallerConfig {
        InstallerConfig::default()
            .with_bin_dir(&self.bin_dir)
            .with_default_algorithm(self.default_algorithm)
            .with_delete_on_mismatch(self.delete_on_mismatch)
    }
}

/// A binary recorded in the installed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    /// `owner/repo` the binary came from.
    pub key: String,
    pub name: String,
    /// Release tag.
    pub version: String,
    pub path: PathBuf,
    pub installed_at: DateTime<Utc>,
}

/// Record of binaries installed by this tool.
#[derive(Debug, Clone)]
pub struct InstalledManifest {
    path: PathBuf,
    entries: Vec<InstalledBinary>,
}

impl InstalledManifest {
    /// Load the manifest at `path`. A missing file is an empty manifest.
    ///
    /// Sections missing a required key are skipped with a warning.
    pub fn load(path: &Path) -> InstallResult<Self> {
        let mut manifest = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        };
        if !path.exists() {
            return Ok(manifest);
        }

        let ini = Ini::load_from_file(path).map_err(|e| {
            InstallError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        for (section, props) in ini.iter() {
            let Some(key) = section else { continue };
            let entry = (|| {
                Some(InstalledBinary {
                    key: key.to_string(),
                    name: props.get("name")?.to_string(),
                    version: props.get("version")?.to_string(),
                    path: PathBuf::from(props.get("path")?),
                    installed_at: DateTime::parse_from_rfc3339(props.get("installed_at")?)
                        .ok()?
                        .with_timezone(&Utc),
                })
            })();
            match entry {
                Some(entry) => manifest.entries.push(entry),
                None => warn!(key, path = %path.display(), "Skipping incomplete manifest entry"),
            }
        }

        debug!(path = %path.display(), entries = manifest.entries.len(), "Loaded installed manifest");
        Ok(manifest)
    }

    /// All recorded binaries, in file order.
    pub fn entries(&self) -> &[InstalledBinary] {
        &self.entries
    }

    /// Look up the binary recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&InstalledBinary> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Add or replace the entry for `binary.key`.
    pub fn record(&mut self, binary: InstalledBinary) {
        match self.entries.iter_mut().find(|entry| entry.key == binary.key) {
            Some(existing) => *existing = binary,
            None => self.entries.push(binary),
        }
    }

    /// Write the manifest, creating its directory if needed.
    pub fn save(&self) -> InstallResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| InstallError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut ini = Ini::new();
        for entry in &self.entries {
            ini.with_section(Some(entry.key.as_str()))
                .set("name", entry.name.as_str())
                .set("version", entry.version.as_str())
                .set("path", entry.path.to_string_lossy())
                .set("installed_at", entry.installed_at.to_rfc3339());
        }

        ini.write_to_file(&self.path)
            .map_err(|e| InstallError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        debug!(path = %self.path.display(), "Saved installed manifest");
        Ok(())
    }
}
