//! Registry client capability consumed by the name cache.
//!
//! The concrete HTTP client lives outside this crate; anything that can
//! answer conditional metadata lookups and list tags will do.

use async_trait::async_trait;
use deckhand_core::Labels;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a registry reports about one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub labels: Labels,
    /// The authoritative name of the image.
    pub canonical_name: String,
    /// Every name the registry knows the image by.
    pub all_names: Vec<String>,
    /// Cache validator for conditional requests.
    pub etag: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The supplied etag is still current.
    #[error("not modified")]
    NotModified,

    #[error("registry request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch metadata for `image_name`. A non-empty `etag` makes the request
    /// conditional: `RegistryError::NotModified` means nothing changed.
    async fn get_image_metadata(
        &self,
        image_name: &str,
        etag: &str,
    ) -> Result<ImageMetadata, RegistryError>;

    /// List every tag of a repository.
    async fn all_tags(&self, repository: &str) -> Result<Vec<String>, RegistryError>;
}

/// A registry that is never reachable.
///
/// Lookups fail and tag listings are empty, so a cache built over it only
/// answers from what was inserted locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRegistry;

#[async_trait]
impl RegistryClient for OfflineRegistry {
    async fn get_image_metadata(
        &self,
        image_name: &str,
        _etag: &str,
    ) -> Result<ImageMetadata, RegistryError> {
        Err(RegistryError::Request(format!(
            "no registry configured to look up {image_name}"
        )))
    }

    async fn all_tags(&self, _repository: &str) -> Result<Vec<String>, RegistryError> {
        Ok(Vec::new())
    }
}
