//! Container image references: `[host[:port]/]path[:tag][@digest]`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{NameCacheError, NameCacheResult};

static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*(?::[0-9]+)?/)?",
        r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*",
        r"(?:/[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*)*$",
    ))
    .expect("valid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").expect("valid regex"));

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}$")
        .expect("valid regex")
});

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(name: &str) -> NameCacheResult<Self> {
        let invalid = |reason: &str| NameCacheError::InvalidImageName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let (rest, digest) = match name.split_once('@') {
            Some((rest, digest)) => {
                if !DIGEST_RE.is_match(digest) {
                    return Err(invalid("malformed digest"));
                }
                (rest, Some(digest.to_string()))
            }
            None => (name, None),
        };

        // A colon after the last slash separates the tag; earlier ones are ports.
        let (repository, tag) = match rest.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => {
                if !TAG_RE.is_match(tag) {
                    return Err(invalid("malformed tag"));
                }
                (repo, Some(tag.to_string()))
            }
            _ => (rest, None),
        };

        if !REPOSITORY_RE.is_match(repository) {
            return Err(invalid("malformed repository name"));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// `repository:tag`, validating both parts.
    pub fn with_tag(repository: &str, tag: &str) -> NameCacheResult<Self> {
        Self::parse(&format!("{repository}:{tag}"))
    }

    /// The repository name, without tag or digest.
    pub fn repository(&self) -> &str {
        &self.repository
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repository_and_tag() {
        let r = ImageRef::parse("repo/img:1.0").unwrap();
        assert_eq!(r.repository(), "repo/img");
        assert_eq!(r.tag.as_deref(), Some("1.0"));
        assert_eq!(r.digest.as_deref(), None);
    }

    #[test]
    fn parse_host_with_port() {
        let r = ImageRef::parse("localhost:5000/team/app:2.1.0").unwrap();
        assert_eq!(r.repository(), "localhost:5000/team/app");
        assert_eq!(r.tag.as_deref(), Some("2.1.0"));

        let untagged = ImageRef::parse("localhost:5000/team/app").unwrap();
        assert_eq!(untagged.repository(), "localhost:5000/team/app");
        assert_eq!(untagged.tag.as_deref(), None);
    }

    #[test]
    fn parse_digest() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = ImageRef::parse(&format!("docker.example.com/app@{digest}")).unwrap();
        assert_eq!(r.repository(), "docker.example.com/app");
        assert_eq!(r.digest.as_deref(), Some(digest.as_str()));
        assert_eq!(r.to_string(), format!("docker.example.com/app@{digest}"));
    }

    #[test]
    fn with_tag_builds_full_name() {
        let r = ImageRef::with_tag("docker.example.com/acme/app", "1.2.3").unwrap();
        assert_eq!(r.to_string(), "docker.example.com/acme/app:1.2.3");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "Upper/Case", "app:", "app:bad tag", "app@sha256:xyz"] {
            assert!(
                matches!(ImageRef::parse(bad), Err(NameCacheError::InvalidImageName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
