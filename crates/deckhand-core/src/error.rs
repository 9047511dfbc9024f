//! Error types for parsing and building source identities.

use thiserror::Error;

/// Result type alias for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors raised while parsing a source identity string or building one
/// from image labels. Each variant carries the input being parsed.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no repository found in {parsing:?}")]
    MissingRepo { parsing: String },

    #[error("no version found in {parsing:?} (did find repo: {repo:?})")]
    MissingVersion { repo: String, parsing: String },

    #[error("no path found in {parsing:?} (did find repo: {repo:?})")]
    MissingPath { repo: String, parsing: String },

    #[error("three parts found (includes a version?) in a canonical name: {parsing:?}")]
    IncludesVersion { parsing: String },

    #[error("cannot parse {parsing:?}: divides into {chunks} chunks")]
    Arity { parsing: String, chunks: usize },

    #[error("invalid version in {parsing:?}: {source}")]
    Version {
        parsing: String,
        source: semver::Error,
    },

    #[error("invalid revision {revision:?}: {source}")]
    Revision {
        revision: String,
        source: semver::Error,
    },

    #[error("missing labels on image: {}", .0.join(", "))]
    MissingLabels(Vec<String>),
}
