//! NameStore — SQLite persistence for the name cache.
//!
//! A single connection is shared by every caller. The in-memory variant
//! uses a named shared-cache database so that every handle opened with the
//! same name sees the same tables.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use deckhand_core::source::short_version;
use deckhand_core::{IdentityResult, SourceLocation, SourceVersion, Version};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::{NameCacheError, NameCacheResult};
use crate::reference::ImageRef;
use crate::schema;

/// Convert any `Display` error into a `NameCacheError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| NameCacheError::$variant(e.to_string())
    };
}

/// Connection URL for a named, shared, in-memory database.
pub fn in_memory_url(name: &str) -> String {
    format!("sqlite:file:{name}?mode=memory&cache=shared")
}

/// A cached image name together with the identity it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedName {
    pub etag: String,
    pub repo: String,
    pub offset: String,
    pub version: String,
    pub canonical_name: String,
}

impl CachedName {
    pub fn source_version(&self) -> IdentityResult<SourceVersion> {
        let version =
            Version::parse(&self.version).map_err(|e| deckhand_core::IdentityError::Version {
                parsing: self.version.clone(),
                source: e,
            })?;
        Ok(SourceVersion::new(&self.repo, version, &self.offset))
    }
}

/// Thread-safe handle to the name cache database.
#[derive(Clone)]
pub struct NameStore {
    pool: SqlitePool,
}

impl NameStore {
    /// Open (or create) a file-backed store.
    pub async fn open(path: &Path) -> NameCacheResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let store = Self::connect(options).await?;
        debug!(?path, "name store opened");
        Ok(store)
    }

    /// Open the shared in-memory store called `name`.
    pub async fn open_in_memory(name: &str) -> NameCacheResult<Self> {
        let options = SqliteConnectOptions::from_str(&in_memory_url(name))
            .map_err(map_err!(Open))?
            .foreign_keys(true);
        let store = Self::connect(options).await?;
        debug!(%name, "in-memory name store opened");
        Ok(store)
    }

    async fn connect(options: SqliteConnectOptions) -> NameCacheResult<Self> {
        // The one connection is never recycled: an in-memory database
        // vanishes when its last connection closes.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(map_err!(Open))?;
        let store = Self { pool };
        store.ensure_tables().await?;
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    async fn ensure_tables(&self) -> NameCacheResult<()> {
        for ddl in schema::ALL {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_err!(Schema))?;
        }
        Ok(())
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Record `canonical_name` as the image for `sv`, plus any aliases.
    ///
    /// Every write upserts on its natural key: the repository name, the
    /// `(repo, offset)` location, the `(location, version)` metadata row and
    /// each alias name. An alias already recorded for another row moves to
    /// this one. The canonical name is always recorded as an alias of itself.
    /// A previous canonical name for the same version is dropped unless it
    /// is passed again in `aliases`.
    pub async fn insert(
        &self,
        sv: &SourceVersion,
        canonical_name: &str,
        etag: &str,
        aliases: &[String],
    ) -> NameCacheResult<()> {
        let reference = ImageRef::parse(canonical_name)?;
        let version = short_version(&sv.version);

        let mut tx = self.pool.begin().await.map_err(map_err!(Write))?;

        let repo_name_id: i64 = sqlx::query_scalar(
            "INSERT INTO docker_repo_name (name) VALUES (?1) \
             ON CONFLICT (name) DO UPDATE SET name = excluded.name \
             RETURNING repo_name_id",
        )
        .bind(reference.repository())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err!(Write))?;

        let location_id: i64 = sqlx::query_scalar(
            "INSERT INTO docker_search_location (repo, repo_offset) VALUES (?1, ?2) \
             ON CONFLICT (repo, repo_offset) DO UPDATE SET repo = excluded.repo \
             RETURNING location_id",
        )
        .bind(sv.repo_url.as_str())
        .bind(sv.repo_offset.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err!(Write))?;

        sqlx::query(
            "INSERT INTO repo_through_location (repo_name_id, location_id) VALUES (?1, ?2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(repo_name_id)
        .bind(location_id)
        .execute(&mut *tx)
        .await
        .map_err(map_err!(Write))?;

        sqlx::query(
            "DELETE FROM docker_search_name WHERE (metadata_id, name) IN ( \
             SELECT metadata_id, canonical_name FROM docker_search_metadata \
             WHERE location_id = ?1 AND version = ?2 AND canonical_name <> ?3)",
        )
        .bind(location_id)
        .bind(version.as_str())
        .bind(canonical_name)
        .execute(&mut *tx)
        .await
        .map_err(map_err!(Write))?;

        let metadata_id: i64 = sqlx::query_scalar(
            "INSERT INTO docker_search_metadata (location_id, etag, canonical_name, version) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (location_id, version) DO UPDATE \
             SET etag = excluded.etag, canonical_name = excluded.canonical_name \
             RETURNING metadata_id",
        )
        .bind(location_id)
        .bind(etag)
        .bind(canonical_name)
        .bind(version.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err!(Write))?;

        let names = std::iter::once(canonical_name).chain(aliases.iter().map(String::as_str));
        for name in names {
            sqlx::query(
                "INSERT INTO docker_search_name (metadata_id, name) VALUES (?1, ?2) \
                 ON CONFLICT (name) DO UPDATE SET metadata_id = excluded.metadata_id",
            )
            .bind(metadata_id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(map_err!(Write))?;
        }

        tx.commit().await.map_err(map_err!(Write))?;
        debug!(
            source_version = %sv,
            %canonical_name,
            %etag,
            aliases = aliases.len(),
            "name stored"
        );
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Look up any recorded image name.
    pub async fn query_on_name(&self, name: &str) -> NameCacheResult<Option<CachedName>> {
        let row = sqlx::query(
            "SELECT m.etag, l.repo, l.repo_offset, m.version, m.canonical_name \
             FROM docker_search_name n \
             JOIN docker_search_metadata m ON m.metadata_id = n.metadata_id \
             JOIN docker_search_location l ON l.location_id = m.location_id \
             WHERE n.name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err!(Read))?;

        row.map(|row| -> Result<CachedName, sqlx::Error> {
            Ok(CachedName {
                etag: row.try_get("etag")?,
                repo: row.try_get("repo")?,
                offset: row.try_get("repo_offset")?,
                version: row.try_get("version")?,
                canonical_name: row.try_get("canonical_name")?,
            })
        })
        .transpose()
        .map_err(map_err!(Read))
    }

    /// The canonical image name recorded for a source version.
    pub async fn query_on_version(&self, sv: &SourceVersion) -> NameCacheResult<Option<String>> {
        sqlx::query_scalar(
            "SELECT m.canonical_name \
             FROM docker_search_metadata m \
             JOIN docker_search_location l ON l.location_id = m.location_id \
             WHERE l.repo = ?1 AND l.repo_offset = ?2 AND m.version = ?3",
        )
        .bind(sv.repo_url.as_str())
        .bind(sv.repo_offset.as_str())
        .bind(short_version(&sv.version))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err!(Read))
    }

    /// Every image name recorded for a source version, sorted.
    pub async fn names_for_version(&self, sv: &SourceVersion) -> NameCacheResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT n.name \
             FROM docker_search_name n \
             JOIN docker_search_metadata m ON m.metadata_id = n.metadata_id \
             JOIN docker_search_location l ON l.location_id = m.location_id \
             WHERE l.repo = ?1 AND l.repo_offset = ?2 AND m.version = ?3 \
             ORDER BY n.name",
        )
        .bind(sv.repo_url.as_str())
        .bind(sv.repo_offset.as_str())
        .bind(short_version(&sv.version))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err!(Read))
    }

    /// Every repository that has held an image for `sl`, sorted.
    pub async fn repos_for_location(&self, sl: &SourceLocation) -> NameCacheResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT r.name \
             FROM docker_repo_name r \
             JOIN repo_through_location t ON t.repo_name_id = r.repo_name_id \
             JOIN docker_search_location l ON l.location_id = t.location_id \
             WHERE l.repo = ?1 AND l.repo_offset = ?2 \
             ORDER BY r.name",
        )
        .bind(sl.repo_url.as_str())
        .bind(sl.repo_offset.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err!(Read))
    }

    #[cfg(test)]
    pub(crate) async fn row_count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    #[cfg(test)]
    pub(crate) async fn execute(&self, sql: &str) {
        sqlx::query(sql).execute(&self.pool).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(version: &str) -> SourceVersion {
        SourceVersion::new("github.com/acme/app", Version::parse(version).unwrap(), "")
    }

    async fn store(name: &str) -> NameStore {
        NameStore::open_in_memory(name).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_query_by_name() {
        let store = store("store_insert_and_query").await;
        store
            .insert(&sv("1.0.0"), "acme/app:1.0.0", "etag-1", &["acme/app:latest".to_string()])
            .await
            .unwrap();

        let row = store.query_on_name("acme/app:latest").await.unwrap().unwrap();
        assert_eq!(row.etag, "etag-1");
        assert_eq!(row.canonical_name, "acme/app:1.0.0");
        assert_eq!(row.source_version().unwrap(), sv("1.0.0"));
        assert!(store.query_on_name("acme/app:2.0.0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reinsert_replaces_instead_of_duplicating() {
        let store = store("store_reinsert").await;
        store.insert(&sv("1.0.0"), "repo/img:1.0", "a", &[]).await.unwrap();
        store.insert(&sv("1.0.0"), "repo/img:1.0", "b", &[]).await.unwrap();

        assert_eq!(store.row_count("docker_search_name").await, 1);
        assert_eq!(store.row_count("docker_search_metadata").await, 1);
        assert_eq!(store.row_count("docker_repo_name").await, 1);
        assert_eq!(store.row_count("repo_through_location").await, 1);
        let row = store.query_on_name("repo/img:1.0").await.unwrap().unwrap();
        assert_eq!(row.etag, "b");
    }

    #[tokio::test]
    async fn new_canonical_name_drops_the_old_one() {
        let store = store("store_canonical_renamed").await;
        let latest = vec!["acme/app:latest".to_string()];
        store.insert(&sv("1.0.0"), "old/app:1.0.0", "a", &latest).await.unwrap();
        store.insert(&sv("1.0.0"), "new/app:1.0.0", "b", &[]).await.unwrap();

        assert_eq!(
            store.names_for_version(&sv("1.0.0")).await.unwrap(),
            vec!["acme/app:latest", "new/app:1.0.0"]
        );
        assert!(store.query_on_name("old/app:1.0.0").await.unwrap().is_none());
        assert_eq!(
            store.query_on_version(&sv("1.0.0")).await.unwrap().as_deref(),
            Some("new/app:1.0.0")
        );

        // Passing the old name explicitly keeps it as an alias.
        let old = vec!["old/app:1.0.0".to_string()];
        store.insert(&sv("1.0.0"), "newer/app:1.0.0", "c", &old).await.unwrap();
        assert_eq!(
            store.names_for_version(&sv("1.0.0")).await.unwrap(),
            vec!["acme/app:latest", "newer/app:1.0.0", "old/app:1.0.0"]
        );
    }

    #[tokio::test]
    async fn versions_of_one_location_coexist() {
        let store = store("store_versions_coexist").await;
        store.insert(&sv("1.0.0"), "acme/app:1.0.0", "", &[]).await.unwrap();
        store.insert(&sv("1.1.0"), "acme/app:1.1.0", "", &[]).await.unwrap();

        assert_eq!(
            store.query_on_version(&sv("1.0.0")).await.unwrap().as_deref(),
            Some("acme/app:1.0.0")
        );
        assert_eq!(
            store.query_on_version(&sv("1.1.0+rev")).await.unwrap().as_deref(),
            Some("acme/app:1.1.0")
        );
        assert_eq!(store.row_count("docker_search_location").await, 1);
    }

    #[tokio::test]
    async fn alias_moves_to_latest_owner() {
        let store = store("store_alias_moves").await;
        let latest = vec!["acme/app:latest".to_string()];
        store.insert(&sv("1.0.0"), "acme/app:1.0.0", "", &latest).await.unwrap();
        store.insert(&sv("1.1.0"), "acme/app:1.1.0", "", &latest).await.unwrap();

        let row = store.query_on_name("acme/app:latest").await.unwrap().unwrap();
        assert_eq!(row.version, "1.1.0");
        assert_eq!(
            store.names_for_version(&sv("1.0.0")).await.unwrap(),
            vec!["acme/app:1.0.0"]
        );
    }

    #[tokio::test]
    async fn repos_for_location_lists_every_repository() {
        let store = store("store_repos_for_location").await;
        store.insert(&sv("1.0.0"), "acme/app:1.0.0", "", &[]).await.unwrap();
        store
            .insert(&sv("1.0.1"), "docker.example.com/acme/app:1.0.1", "", &[])
            .await
            .unwrap();

        let repos = store
            .repos_for_location(&sv("1.0.0").canonical_name())
            .await
            .unwrap();
        assert_eq!(repos, vec!["acme/app", "docker.example.com/acme/app"]);
        assert!(store
            .repos_for_location(&SourceLocation::new("github.com/other", ""))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn invalid_canonical_name_is_rejected() {
        let store = store("store_invalid_name").await;
        let err = store.insert(&sv("1.0.0"), "Not A Name", "", &[]).await.unwrap_err();
        assert!(matches!(err, NameCacheError::InvalidImageName { .. }));
        assert_eq!(store.row_count("docker_search_metadata").await, 0);
    }

    #[tokio::test]
    async fn in_memory_store_is_shared_by_name() {
        let a = store("store_shared").await;
        let b = store("store_shared").await;
        a.insert(&sv("1.0.0"), "acme/app:1.0.0", "", &[]).await.unwrap();
        assert!(b.query_on_name("acme/app:1.0.0").await.unwrap().is_some());

        let other = store("store_not_shared").await;
        assert!(other.query_on_name("acme/app:1.0.0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("names.db");

        {
            let store = NameStore::open(&db_path).await.unwrap();
            store.insert(&sv("1.0.0"), "acme/app:1.0.0", "e", &[]).await.unwrap();
            store.pool.close().await;
        }

        let store = NameStore::open(&db_path).await.unwrap();
        let row = store.query_on_name("acme/app:1.0.0").await.unwrap();
        assert_eq!(row.map(|r| r.etag), Some("e".to_string()));
    }
}
