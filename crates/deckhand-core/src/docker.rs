//! Mapping between source versions and container image metadata.
//!
//! Images built from a source version carry four labels naming it. Reading
//! them back gives the image's identity; the image name itself is derived
//! from the repository URL.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use semver::{BuildMetadata, Version};

use crate::error::{IdentityError, IdentityResult};
use crate::source::{SourceVersion, short_version};

/// Image labels, as reported by a registry.
pub type Labels = HashMap<String, String>;

pub const DOCKER_REPO_LABEL: &str = "com.opentable.sous.repo_url";
pub const DOCKER_VERSION_LABEL: &str = "com.opentable.sous.version";
pub const DOCKER_REVISION_LABEL: &str = "com.opentable.sous.revision";
pub const DOCKER_PATH_LABEL: &str = "com.opentable.sous.repo_offset";

/// Leading scheme and the default host/org, dropped from image names.
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([[:alpha:]]+://)?(github\.com(/opentable)?/?)?").expect("valid regex")
});

impl SourceVersion {
    /// Build a source version from image labels.
    ///
    /// All four labels are required; every missing key is reported in one
    /// error. The revision label becomes the version's build metadata.
    pub fn from_labels(labels: &Labels) -> IdentityResult<Self> {
        let required = [
            DOCKER_REPO_LABEL,
            DOCKER_VERSION_LABEL,
            DOCKER_REVISION_LABEL,
            DOCKER_PATH_LABEL,
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|key| !labels.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IdentityError::MissingLabels(missing));
        }

        let version_str = &labels[DOCKER_VERSION_LABEL];
        let mut version = Version::parse(version_str).map_err(|e| IdentityError::Version {
            parsing: version_str.clone(),
            source: e,
        })?;

        let revision = build_metadata(&labels[DOCKER_REVISION_LABEL]);
        version.build = if revision.is_empty() {
            BuildMetadata::EMPTY
        } else {
            BuildMetadata::new(&revision)
                .map_err(|e| IdentityError::Revision { revision, source: e })?
        };

        Ok(SourceVersion {
            repo_url: labels[DOCKER_REPO_LABEL].clone(),
            version,
            repo_offset: labels[DOCKER_PATH_LABEL].clone(),
        })
    }

    /// The labels an image built from this source version should carry.
    pub fn docker_labels(&self) -> Labels {
        HashMap::from([
            (DOCKER_VERSION_LABEL.to_string(), short_version(&self.version)),
            (DOCKER_REVISION_LABEL.to_string(), self.rev_id().to_string()),
            (DOCKER_PATH_LABEL.to_string(), self.repo_offset.clone()),
            (DOCKER_REPO_LABEL.to_string(), self.repo_url.clone()),
        ])
    }

    /// Image name for this source version: `<repo>[/<offset>]:<version>`.
    pub fn docker_image_name(&self) -> String {
        let mut name = STRIP_RE.replace(&self.repo_url, "").into_owned();
        if !self.repo_offset.is_empty() {
            name.push('/');
            name.push_str(&self.repo_offset);
        }
        name.push(':');
        name.push_str(&short_version(&self.version));
        name
    }
}

/// Coerce a revision label into valid build metadata.
///
/// Characters outside `[0-9A-Za-z-]` become `-` and empty dot-separated
/// identifiers are dropped, so `feature_x` reads back as `feature-x`.
fn build_metadata(revision: &str) -> String {
    revision
        .split('.')
        .filter(|ident| !ident.is_empty())
        .map(|ident| {
            ident
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn image_name_strips_scheme_and_org() {
        let sv = SourceVersion::new(
            "https://github.com/opentable/foo",
            Version::new(2, 0, 0),
            "",
        );
        assert_eq!(sv.docker_image_name(), "foo:2.0.0");
    }

    #[test]
    fn image_name_appends_offset_and_prerelease() {
        let sv = SourceVersion::new(
            "github.com/acme/bar",
            Version::parse("1.4.0-rc.2+deadbeef").unwrap(),
            "services/api",
        );
        assert_eq!(sv.docker_image_name(), "acme/bar/services/api:1.4.0-rc.2");
    }

    #[test]
    fn labels_round_trip_keeps_revision() {
        let sv = SourceVersion::new(
            "github.com/x/y",
            Version::parse("1.2.3+abc123").unwrap(),
            "sub",
        );
        let back = SourceVersion::from_labels(&sv.docker_labels()).unwrap();
        assert_eq!(back, sv);
        assert_eq!(back.rev_id(), "abc123");
    }

    #[test]
    fn loose_revision_labels_are_coerced() {
        for (revision, expected) in [
            ("feature_x", "feature-x"),
            ("a..b/c", "a.b-c"),
            ("refs/heads/main", "refs-heads-main"),
            ("...", ""),
        ] {
            let sv = SourceVersion::from_labels(&labels(&[
                (DOCKER_REPO_LABEL, "github.com/x/y"),
                (DOCKER_VERSION_LABEL, "1.2.3"),
                (DOCKER_REVISION_LABEL, revision),
                (DOCKER_PATH_LABEL, ""),
            ]))
            .unwrap();
            assert_eq!(sv.rev_id(), expected, "{revision}");
            assert_eq!(sv.version, Version::new(1, 2, 3));
        }
    }

    #[test]
    fn missing_labels_reported_together() {
        let partial = labels(&[(DOCKER_REPO_LABEL, "github.com/x/y"), (DOCKER_PATH_LABEL, "")]);
        match SourceVersion::from_labels(&partial).unwrap_err() {
            IdentityError::MissingLabels(missing) => {
                assert_eq!(missing, vec![DOCKER_VERSION_LABEL, DOCKER_REVISION_LABEL]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_version_label_is_rejected() {
        let bad = labels(&[
            (DOCKER_REPO_LABEL, "github.com/x/y"),
            (DOCKER_VERSION_LABEL, "one.two"),
            (DOCKER_REVISION_LABEL, "abc"),
            (DOCKER_PATH_LABEL, ""),
        ]);
        assert!(matches!(
            SourceVersion::from_labels(&bad),
            Err(IdentityError::Version { .. })
        ));
    }
}
