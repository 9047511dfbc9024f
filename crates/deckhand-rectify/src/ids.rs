//! Scheduler identifiers: stable request ids and fresh deploy ids.

use std::sync::LazyLock;

use deckhand_core::Deployment;
use regex::Regex;
use uuid::Uuid;

static ILLEGAL_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-/:]").expect("valid regex"));

/// Strip the characters the scheduler refuses in identifiers.
pub fn idify(id: &str) -> String {
    ILLEGAL_ID_CHARS.replace_all(id, "").into_owned()
}

/// The scheduler request id for a deployment.
///
/// An explicit id is used unchanged. Otherwise the id is derived from
/// `repo[:offset]`, so the same software keeps the same request across runs.
pub fn compute_request_id(deployment: &Deployment) -> String {
    if !deployment.request_id.is_empty() {
        return deployment.request_id.clone();
    }
    let sv = &deployment.source_version;
    if sv.repo_offset.is_empty() {
        idify(&sv.repo_url)
    } else {
        idify(&format!("{}:{}", sv.repo_url, sv.repo_offset))
    }
}

/// Source of fresh deploy ids.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_core::{SourceVersion, Version};
    use proptest::prelude::*;

    fn deployment(repo: &str, offset: &str) -> Deployment {
        Deployment::new(
            "test-cluster",
            SourceVersion::new(repo, Version::new(1, 2, 3), offset),
        )
    }

    #[test]
    fn explicit_request_id_wins() {
        let mut d = deployment("github.com/acme/app", "");
        d.request_id = "my-request:id/1".to_string();
        assert_eq!(compute_request_id(&d), "my-request:id/1");
    }

    #[test]
    fn derived_request_id() {
        assert_eq!(
            compute_request_id(&deployment("github.com/acme/my-app", "")),
            "github.comacmemyapp"
        );
        assert_eq!(
            compute_request_id(&deployment("https://github.com/acme/app", "svc/api")),
            "httpsgithub.comacmeappsvcapi"
        );
        assert_eq!(
            compute_request_id(&deployment("github.com/acme/app", "svc")),
            "github.comacmeappsvc"
        );
    }

    #[test]
    fn derived_request_id_ignores_version() {
        let a = deployment("github.com/acme/app", "");
        let mut b = a.clone();
        b.source_version.version = Version::new(9, 9, 9);
        assert_eq!(compute_request_id(&a), compute_request_id(&b));
    }

    #[test]
    fn uuid_ids_are_unique_and_idifiable() {
        let ids = UuidIdGenerator;
        let a = idify(&ids.new_id());
        let b = idify(&ids.new_id());
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(!a.contains('-'));
    }

    proptest! {
        #[test]
        fn explicit_ids_pass_through(id in "[a-zA-Z0-9:/_-]{1,40}") {
            let mut d = deployment("github.com/acme/app", "");
            d.request_id = id.clone();
            prop_assert_eq!(compute_request_id(&d), id);
        }

        #[test]
        fn derived_ids_are_stable_and_clean(
            repo in "[a-z]{1,8}(\\.[a-z]{2,3})?(/[a-z0-9-]{1,10}){0,3}",
            offset in "([a-z0-9:,_-]{1,8}(/[a-z0-9_-]{1,8}){0,2})?",
        ) {
            let d = deployment(&repo, &offset);
            let first = compute_request_id(&d);
            prop_assert_eq!(&first, &compute_request_id(&d.clone()));
            prop_assert!(!first.contains(['-', '/', ':']));
            if !d.source_version.repo_offset.contains(',') {
                prop_assert!(!first.contains(','));
            }
        }
    }
}
