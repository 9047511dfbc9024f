//! Error types for the Deckhand name cache.

use deckhand_core::{IdentityError, SourceVersion};
use thiserror::Error;

use crate::registry::RegistryError;

/// Result type alias for name cache operations.
pub type NameCacheResult<T> = Result<T, NameCacheError>;

/// Errors that can occur during name cache operations.
///
/// `NoImageNameFound` and `NoSourceVersionFound` are cache misses; callers
/// only see them once every fallback has been tried.
#[derive(Debug, Error)]
pub enum NameCacheError {
    #[error("failed to open name cache database: {0}")]
    Open(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("no image name for {0}")]
    NoImageNameFound(SourceVersion),

    #[error("no source version for {0}")]
    NoSourceVersionFound(String),

    #[error("invalid image name {name:?}: {reason}")]
    InvalidImageName { name: String, reason: String },

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
