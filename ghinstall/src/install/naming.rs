//! Install file name derivation.

use std::sync::OnceLock;

use regex::Regex;

fn version_suffix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[_-]v?\d+\.\d+\.\d+").expect("version pattern is valid"))
}

/// Derive the installed binary name from a release asset name.
///
/// Everything before the first `-1.2.3` / `_v1.2.3` style version marker is
/// kept. Without a version marker the first `-`/`_` separated segment is used.
/// A name that would come out empty falls back to the asset name itself.
///
/// # Examples
///
/// ```
/// use ghinstall::install::derive_binary_name;
///
/// assert_eq!(derive_binary_name("gh-install_v0.4.0_linux_amd64"), "gh-install");
/// assert_eq!(derive_binary_name("tool_linux_amd64"), "tool");
/// ```
pub fn derive_binary_name(asset_name: &str) -> &str {
    let name = match version_suffix_regex().find(asset_name) {
        Some(m) => &asset_name[..m.start()],
        None => asset_name
            .split(['-', '_'])
            .next()
            .unwrap_or(asset_name),
    };

    if name.is_empty() {
        asset_name
    } else {
        name
    }
}
