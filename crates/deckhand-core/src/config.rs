//! deckhand.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Database location selecting the volatile in-memory name cache.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeckhandConfig {
    pub name_cache: NameCacheConfig,
    pub log: LogConfig,
    pub rectify: RectifyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameCacheConfig {
    /// SQLite file path (`~/` is expanded), or `:memory:`.
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Audit messages attached to scheduler calls made by the rectifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub delete_message: String,
    pub scale_message: String,
}

impl Default for NameCacheConfig {
    fn default() -> Self {
        Self {
            database: "~/.deckhand/names.db".to_string(),
        }
    }
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            delete_message: "deleting request for removed manifest".to_string(),
            scale_message: "rectified scaling".to_string(),
        }
    }
}

impl DeckhandConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DeckhandConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl NameCacheConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    /// The database path with `~/` expanded.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        resolve_path(&self.database)
    }
}

/// Expand a leading `~/` to the current user's home directory.
pub fn resolve_path(path: &str) -> anyhow::Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to resolve path beginning ~/: no home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
