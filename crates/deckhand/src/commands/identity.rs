//! Identity commands: pure transformations of source identity strings.

use std::collections::BTreeMap;

use deckhand_core::{EntityName, SourceVersion};
use serde_json::json;

pub fn parse(name: &str) -> anyhow::Result<String> {
    let value = match EntityName::parse(name)? {
        EntityName::Location(sl) => json!({
            "kind": "location",
            "repo": sl.repo_url,
            "offset": sl.repo_offset,
        }),
        EntityName::Version(sv) => json!({
            "kind": "version",
            "repo": sv.repo_url,
            "offset": sv.repo_offset,
            "version": sv.tag_name(),
            "revision": sv.rev_id(),
        }),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn image_name(source_version: &str) -> anyhow::Result<String> {
    Ok(SourceVersion::parse(source_version)?.docker_image_name())
}

pub fn labels(source_version: &str) -> anyhow::Result<String> {
    let labels: BTreeMap<String, String> = SourceVersion::parse(source_version)?
        .docker_labels()
        .into_iter()
        .collect();
    Ok(serde_json::to_string_pretty(&labels)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version() {
        let out: serde_json::Value =
            serde_json::from_str(&parse("github.com/acme/app,1.2.3-rc.1+abc,svc").unwrap()).unwrap();
        assert_eq!(out["kind"], "version");
        assert_eq!(out["repo"], "github.com/acme/app");
        assert_eq!(out["offset"], "svc");
        assert_eq!(out["version"], "1.2.3-rc.1");
        assert_eq!(out["revision"], "abc");
    }

    #[test]
    fn parse_location() {
        let out: serde_json::Value =
            serde_json::from_str(&parse("github.com/acme/app,svc").unwrap()).unwrap();
        assert_eq!(out["kind"], "location");
        assert_eq!(out["offset"], "svc");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("a,b,c,d").is_err());
    }

    #[test]
    fn image_name_strips_github_prefix() {
        assert_eq!(
            image_name("https://github.com/opentable/foo 2.0.0").unwrap(),
            "foo:2.0.0"
        );
    }

    #[test]
    fn labels_as_json() {
        let out: BTreeMap<String, String> =
            serde_json::from_str(&labels("github.com/acme/app 1.2.3+abc").unwrap()).unwrap();
        assert_eq!(out["com.opentable.sous.version"], "1.2.3");
        assert_eq!(out["com.opentable.sous.revision"], "abc");
        assert_eq!(out["com.opentable.sous.repo_url"], "github.com/acme/app");
        assert_eq!(out["com.opentable.sous.repo_offset"], "");
    }
}
