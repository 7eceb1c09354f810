//! Parsing of the `owner/repo[@version]` command-line argument.
//!
//! # Examples
//!
//! ```
//! use ghinstall::reference::{RepositoryReference, VersionSelector};
//!
//! let r: RepositoryReference = "cli/cli@v2.40.0".parse().unwrap();
//! assert_eq!(r.owner, "cli");
//! assert_eq!(r.repo, "cli");
//! assert_eq!(r.version, VersionSelector::Tag("v2.40.0".to_string()));
//!
//! let latest: RepositoryReference = "cli/cli".parse().unwrap();
//! assert_eq!(latest.version, VersionSelector::Latest);
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Token selecting the most recent release.
pub const LATEST: &str = "latest";

/// Which release of a repository to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// The most recent published release.
    Latest,
    /// An explicit release tag.
    Tag(String),
}

impl VersionSelector {
    fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case(LATEST) {
            Self::Latest
        } else {
            Self::Tag(token.to_string())
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}

/// A GitHub repository plus the release to fetch from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    pub owner: String,
    pub repo: String,
    pub version: VersionSelector,
}

impl RepositoryReference {
    /// `owner/repo` without the version.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.version)
    }
}

impl FromStr for RepositoryReference {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse `owner/repo` or `owner/repo@version`.
pub fn parse(input: &str) -> InstallResult<RepositoryReference> {
    let invalid = |reason: &str| InstallError::InvalidArgumentFormat {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (owner_repo, version) = match input.split_once('@') {
        Some((_, rest)) if rest.contains('@') => {
            return Err(invalid("expected owner/repo[@version]"));
        }
        Some((_, "")) => return Err(invalid("missing version after '@'")),
        Some((owner_repo, version)) => (owner_repo, VersionSelector::from_token(version)),
        None => (input, VersionSelector::Latest),
    };

    let (owner, repo) = split_owner_repo(owner_repo)
        .ok_or_else(|| invalid("expected owner/repo or owner/repo@version"))?;

    if owner.contains(['/', '@']) {
        return Err(invalid(&format!("invalid characters in owner '{}'", owner)));
    }
    if repo.contains(['/', '@']) {
        return Err(invalid(&format!("invalid characters in repo '{}'", repo)));
    }

    debug!(owner, repo, version = %version, "Parsed repository argument");

    Ok(RepositoryReference {
        owner: owner.to_string(),
        repo: repo.to_string(),
        version,
    })
}

fn split_owner_repo(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some((owner, repo))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_repo_defaults_to_latest() {
        let r = parse("esacteksab/gh-install").unwrap();
        assert_eq!(r.owner, "esacteksab");
        assert_eq!(r.repo, "gh-install");
        assert_eq!(r.version, VersionSelector::Latest);
    }

    #[test]
    fn test_parse_with_tag() {
        let r = parse("owner/repo@v1.2.3").unwrap();
        assert_eq!(r.version, VersionSelector::Tag("v1.2.3".to_string()));
        assert_eq!(r.slug(), "owner/repo");
        assert_eq!(r.to_string(), "owner/repo@v1.2.3");
    }

    #[test]
    fn test_parse_explicit_latest() {
        let r = parse("owner/repo@latest").unwrap();
        assert_eq!(r.version, VersionSelector::Latest);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in [
            "owner/",
            "/repo",
            "@latest",
            "",
            "owner",
            "owner/repo/extra",
            "owner/repo/extra@latest",
            "owner/repo@tag@extra",
            "owner/repo@",
            "/@v1",
        ] {
            let result = parse(input);
            assert!(
                matches!(result, Err(InstallError::InvalidArgumentFormat { .. })),
                "expected '{}' to be rejected, got {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_error_names_offending_input() {
        let err = parse("owner/repo@tag@extra").unwrap_err();
        assert!(err.to_string().contains("owner/repo@tag@extra"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_roundtrip_property(
                owner in "[A-Za-z0-9][A-Za-z0-9._-]{0,20}",
                repo in "[A-Za-z0-9][A-Za-z0-9._-]{0,20}",
                tag in "v?[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"
            ) {
                let bare = parse(&format!("{}/{}", owner, repo))?;
                prop_assert_eq!(&bare.owner, &owner);
                prop_assert_eq!(&bare.repo, &repo);
                prop_assert_eq!(bare.version, VersionSelector::Latest);

                let tagged = parse(&format!("{}/{}@{}", owner, repo, tag))?;
                prop_assert_eq!(&tagged.owner, &owner);
                prop_assert_eq!(&tagged.repo, &repo);
                prop_assert_eq!(tagged.version, VersionSelector::Tag(tag.clone()));
            }
        }
    }
}
