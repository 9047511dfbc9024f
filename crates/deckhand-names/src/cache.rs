//! NameCache — source versions to image names and back.
//!
//! Lookups read through the local store to the registry:
//!
//! - By image name: a cached row supplies an etag for a conditional fetch.
//!   `NotModified` returns the cached identity; fresh metadata is parsed
//!   from the image labels and written back with every alias.
//! - By source version: a miss triggers a harvest. Every repository ever
//!   recorded for the source location has all its tags pulled through the
//!   cache, then the lookup is retried once.
//!
//! No per-key locking is done. Concurrent lookups of the same key may fetch
//! twice; the writes are upserts, so the outcome is the same.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use deckhand_core::{SourceLocation, SourceVersion};
use tracing::{Span, debug, info_span, warn};

use crate::error::{NameCacheError, NameCacheResult};
use crate::reference::ImageRef;
use crate::registry::{RegistryClient, RegistryError};
use crate::store::NameStore;

/// The four name cache operations, for consumers that want to substitute
/// their own mapping.
#[async_trait]
pub trait ImageMapper: Send + Sync {
    /// The canonical name for an image, given any known name.
    async fn get_canonical_name(&self, image_name: &str) -> NameCacheResult<String>;

    /// Record a source version / image name pair without asking the registry.
    async fn insert(&self, sv: &SourceVersion, image_name: &str, etag: &str)
    -> NameCacheResult<()>;

    /// The image name for a source version.
    async fn get_image_name(&self, sv: &SourceVersion) -> NameCacheResult<String>;

    /// The source version an image was built from.
    async fn get_source_version(&self, image_name: &str) -> NameCacheResult<SourceVersion>;
}

/// Registry-backed name cache.
#[derive(Clone)]
pub struct NameCache {
    registry: Arc<dyn RegistryClient>,
    store: NameStore,
    span: Span,
}

impl NameCache {
    pub fn new(registry: Arc<dyn RegistryClient>, store: NameStore) -> Self {
        Self {
            registry,
            store,
            span: info_span!("name_cache"),
        }
    }

    /// Open a cache over a file-backed store.
    pub async fn open(registry: Arc<dyn RegistryClient>, path: &Path) -> NameCacheResult<Self> {
        Ok(Self::new(registry, NameStore::open(path).await?))
    }

    /// Open a cache over the shared in-memory store called `name`.
    pub async fn in_memory(
        registry: Arc<dyn RegistryClient>,
        name: &str,
    ) -> NameCacheResult<Self> {
        Ok(Self::new(registry, NameStore::open_in_memory(name).await?))
    }

    /// Log under `span` instead of the default `name_cache` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn store(&self) -> &NameStore {
        &self.store
    }

    pub async fn get_source_version(&self, image_name: &str) -> NameCacheResult<SourceVersion> {
        let (etag, cached) = match self.store.query_on_name(image_name).await? {
            Some(row) => {
                debug!(parent: &self.span, %image_name, etag = %row.etag, "cached name found");
                let sv = row.source_version()?;
                (row.etag, Some(sv))
            }
            None => {
                debug!(parent: &self.span, %image_name, "name not cached");
                (String::new(), None)
            }
        };

        let metadata = match self.registry.get_image_metadata(image_name, &etag).await {
            Ok(metadata) => metadata,
            Err(RegistryError::NotModified) => {
                debug!(parent: &self.span, %image_name, "registry reports not modified");
                return cached
                    .ok_or_else(|| NameCacheError::NoSourceVersionFound(image_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let sv = SourceVersion::from_labels(&metadata.labels)?;
        let canonical = if metadata.canonical_name.is_empty() {
            image_name
        } else {
            metadata.canonical_name.as_str()
        };
        let aliases: Vec<String> = metadata
            .all_names
            .iter()
            .map(String::as_str)
            .chain([image_name])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        self.store
            .insert(&sv, canonical, &metadata.etag, &aliases)
            .await?;
        debug!(parent: &self.span, %image_name, source_version = %sv, "name refreshed from registry");
        Ok(sv)
    }

    pub async fn get_image_name(&self, sv: &SourceVersion) -> NameCacheResult<String> {
        if let Some(name) = self.store.query_on_version(sv).await? {
            return Ok(name);
        }

        debug!(parent: &self.span, source_version = %sv, "no image name cached, harvesting");
        self.harvest(&sv.canonical_name()).await?;

        self.store
            .query_on_version(sv)
            .await?
            .ok_or_else(|| NameCacheError::NoImageNameFound(sv.clone()))
    }

    pub async fn get_canonical_name(&self, image_name: &str) -> NameCacheResult<String> {
        self.store
            .query_on_name(image_name)
            .await?
            .map(|row| row.canonical_name)
            .ok_or_else(|| NameCacheError::NoSourceVersionFound(image_name.to_string()))
    }

    pub async fn insert(
        &self,
        sv: &SourceVersion,
        image_name: &str,
        etag: &str,
    ) -> NameCacheResult<()> {
        self.store.insert(sv, image_name, etag, &[]).await
    }

    /// Pull every tag of every repository known for `sl` into the cache.
    ///
    /// Failures for individual repositories or tags are logged and skipped.
    async fn harvest(&self, sl: &SourceLocation) -> NameCacheResult<()> {
        let repos = self.store.repos_for_location(sl).await?;
        debug!(parent: &self.span, location = %sl, repos = repos.len(), "harvesting");

        for repo in repos {
            let tags = match self.registry.all_tags(&repo).await {
                Ok(tags) => tags,
                Err(e) => {
                    warn!(parent: &self.span, %repo, error = %e, "listing tags failed");
                    continue;
                }
            };

            for tag in tags {
                let name = match ImageRef::with_tag(&repo, &tag) {
                    Ok(reference) => reference.to_string(),
                    Err(e) => {
                        warn!(parent: &self.span, %repo, %tag, error = %e, "skipping tag");
                        continue;
                    }
                };
                if let Err(e) = self.get_source_version(&name).await {
                    debug!(parent: &self.span, %name, error = %e, "harvest lookup failed");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ImageMapper for NameCache {
    async fn get_canonical_name(&self, image_name: &str) -> NameCacheResult<String> {
        NameCache::get_canonical_name(self, image_name).await
    }

    async fn insert(
        &self,
        sv: &SourceVersion,
        image_name: &str,
        etag: &str,
    ) -> NameCacheResult<()> {
        NameCache::insert(self, sv, image_name, etag).await
    }

    async fn get_image_name(&self, sv: &SourceVersion) -> NameCacheResult<String> {
        NameCache::get_image_name(self, sv).await
    }

    async fn get_source_version(&self, image_name: &str) -> NameCacheResult<SourceVersion> {
        NameCache::get_source_version(self, image_name).await
    }
}
