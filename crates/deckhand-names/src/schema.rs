//! SQLite schema for the name cache.
//!
//! Five relations: repository names, search locations (repo + offset), the
//! join between them, per-version metadata, and alias names. Every natural
//! key is unique; writes upsert on those keys so re-inserting overwrites
//! rather than duplicating. Deletes cascade from location to metadata to
//! names, and from repository name to the join table.

/// Registry repository names (image names without tag).
pub const DOCKER_REPO_NAME: &str = r#"
CREATE TABLE IF NOT EXISTS docker_repo_name (
    repo_name_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    UNIQUE (name)
)
"#;

/// Source locations keyed by `(repo, repo_offset)`.
pub const DOCKER_SEARCH_LOCATION: &str = r#"
CREATE TABLE IF NOT EXISTS docker_search_location (
    location_id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo TEXT NOT NULL,
    repo_offset TEXT NOT NULL,
    UNIQUE (repo, repo_offset)
)
"#;

/// Which repositories have held images for which locations.
pub const REPO_THROUGH_LOCATION: &str = r#"
CREATE TABLE IF NOT EXISTS repo_through_location (
    repo_name_id INTEGER NOT NULL
        REFERENCES docker_repo_name ON DELETE CASCADE ON UPDATE CASCADE,
    location_id INTEGER NOT NULL
        REFERENCES docker_search_location ON DELETE CASCADE ON UPDATE CASCADE,
    PRIMARY KEY (repo_name_id, location_id)
)
"#;

/// One row per `(location, version)`: the canonical image name and etag.
pub const DOCKER_SEARCH_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS docker_search_metadata (
    metadata_id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL
        REFERENCES docker_search_location ON DELETE CASCADE ON UPDATE CASCADE,
    etag TEXT NOT NULL,
    canonical_name TEXT NOT NULL,
    version TEXT NOT NULL,
    UNIQUE (location_id, version)
)
"#;

/// Every known image name, each pointing at exactly one metadata row.
pub const DOCKER_SEARCH_NAME: &str = r#"
CREATE TABLE IF NOT EXISTS docker_search_name (
    name_id INTEGER PRIMARY KEY AUTOINCREMENT,
    metadata_id INTEGER NOT NULL
        REFERENCES docker_search_metadata ON DELETE CASCADE ON UPDATE CASCADE,
    name TEXT NOT NULL UNIQUE
)
"#;

/// All DDL statements in dependency order.
pub const ALL: [&str; 5] = [
    DOCKER_REPO_NAME,
    DOCKER_SEARCH_LOCATION,
    REPO_THROUGH_LOCATION,
    DOCKER_SEARCH_METADATA,
    DOCKER_SEARCH_NAME,
];
