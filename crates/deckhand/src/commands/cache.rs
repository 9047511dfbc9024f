//! Name cache commands.
//!
//! No registry client ships with the binary, so the cache only answers from
//! what has been recorded locally.

use std::sync::Arc;

use deckhand_core::{NameCacheConfig, SourceVersion};
use deckhand_names::{NameCache, OfflineRegistry};
use tracing::info;

/// Shared in-memory database name used when the configured database is `:memory:`.
const IN_MEMORY_NAME: &str = "deckhand";

pub async fn open(config: &NameCacheConfig) -> anyhow::Result<NameCache> {
    let registry = Arc::new(OfflineRegistry);
    if config.is_in_memory() {
        info!("using in-memory name cache");
        return Ok(NameCache::in_memory(registry, IN_MEMORY_NAME).await?);
    }

    let path = config.database_path()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    info!(path = ?path, "opening name cache");
    Ok(NameCache::open(registry, &path).await?)
}

pub async fn insert(
    cache: &NameCache,
    source_version: &str,
    image: &str,
    etag: &str,
) -> anyhow::Result<String> {
    let sv = SourceVersion::parse(source_version)?;
    cache.insert(&sv, image, etag).await?;
    Ok(format!("{image} -> {sv}"))
}

pub async fn canonical(cache: &NameCache, image: &str) -> anyhow::Result<String> {
    Ok(cache.get_canonical_name(image).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_canonical_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = NameCacheConfig {
            database: dir.path().join("nested/names.db").display().to_string(),
        };

        let cache = open(&config).await.unwrap();
        let out = insert(&cache, "github.com/acme/app 1.2.3", "acme/app:1.2.3", "e1")
            .await
            .unwrap();
        assert_eq!(out, "acme/app:1.2.3 -> github.com/acme/app 1.2.3");
        assert_eq!(
            canonical(&cache, "acme/app:1.2.3").await.unwrap(),
            "acme/app:1.2.3"
        );
        assert!(dir.path().join("nested/names.db").exists());
    }

    #[tokio::test]
    async fn unknown_image_is_an_error() {
        let config = NameCacheConfig {
            database: deckhand_core::config::IN_MEMORY.to_string(),
        };
        let cache = open(&config).await.unwrap();
        assert!(canonical(&cache, "acme/unknown:1.0.0").await.is_err());
    }
}
