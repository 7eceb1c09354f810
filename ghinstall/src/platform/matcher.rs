//! Filename matching against the host OS/architecture.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use super::host::HostPlatform;

/// Precompiled case-insensitive patterns recognising assets built for one platform.
///
/// Built once at startup and shared by reference. A matcher without patterns
/// (see [`PlatformMatcher::default`]) matches nothing.
#[derive(Debug, Clone, Default)]
pub struct PlatformMatcher {
    patterns: Vec<Regex>,
    excluded: Vec<Regex>,
}

/// A token must not run on into another letter or digit, so `arm` does not
/// match inside `arm64`.
const TOKEN_END: &str = "(?:[^a-z0-9]|$)";

fn compile(source: &str) -> Option<Regex> {
    match RegexBuilder::new(source).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(pattern = %source, error = %e, "Skipping invalid platform pattern");
            None
        }
    }
}

impl PlatformMatcher {
    /// Compile the patterns for every OS/architecture token pair of `host`.
    ///
    /// Each pair accepts `<os><sep><arch>` and `<arch><sep><os>` with a
    /// separator in `-`, `_`, `/`, or both tokens anywhere in either order.
    /// Every token must end at a non-alphanumeric character or the end of the
    /// name. Names carrying a foreign OS that embeds the host's token (an
    /// `android` build on Linux) never match.
    pub fn new(host: &HostPlatform) -> Self {
        let mut sources = Vec::new();
        for os in host.os_tokens() {
            let os = regex::escape(os);
            for arch in host.arch_tokens() {
                let arch = regex::escape(arch);
                sources.push(format!("{os}[-_/]{arch}{TOKEN_END}"));
                sources.push(format!("{arch}[-_/]{os}{TOKEN_END}"));
                sources.push(format!(
                    "({os}{TOKEN_END}.*{arch}{TOKEN_END}|{arch}{TOKEN_END}.*{os}{TOKEN_END})"
                ));
            }
        }

        let patterns = sources
            .iter()
            .filter_map(|source| compile(source))
            .collect::<Vec<_>>();

        let excluded = host
            .foreign_os_tokens()
            .into_iter()
            .filter_map(|token| {
                compile(&format!(
                    "(?:^|[^a-z0-9]){}{TOKEN_END}",
                    regex::escape(token)
                ))
            })
            .collect::<Vec<_>>();

        debug!(
            platform = %host,
            count = patterns.len(),
            excluded = excluded.len(),
            "Compiled platform patterns"
        );
        Self { patterns, excluded }
    }

    /// Matcher for the platform this process runs on.
    pub fn for_current_host() -> Self {
        Self::new(&HostPlatform::current())
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Whether `filename` names an asset for the host platform.
    pub fn matches(&self, filename: &str) -> bool {
        if self.patterns.is_empty() {
            warn!(filename, "Platform patterns not initialized; treating as no match");
            return false;
        }

        if let Some(re) = self.excluded.iter().find(|re| re.is_match(filename)) {
            debug!(filename, pattern = %re, "Asset targets another operating system");
            return false;
        }

        match self.patterns.iter().position(|re| re.is_match(filename)) {
            Some(index) => {
                debug!(filename, pattern = %self.patterns[index], "Asset matched platform");
                true
            }
            None => {
                debug!(filename, "Asset did not match any platform pattern");
                false
            }
        }
    }
}
