//! Source identities and their canonical string forms.
//!
//! A [`SourceLocation`] names a piece of software (repository + offset
//! within it). A [`SourceVersion`] adds a semantic version and so names one
//! buildable snapshot.
//!
//! # String forms
//!
//! ```text
//! <repo><delim><version>[<delim><offset>]     source version
//! <repo>[<delim><offset>]                     source location
//! ```
//!
//! If the first character is not an ASCII letter it is taken as the
//! delimiter (`|github.com/x/y|1.0.0|sub`). Otherwise the delimiter is a
//! comma, or a single space when the input holds no comma, which is the
//! form `SourceVersion` displays itself in.
//!
//! A repository or offset that holds a comma or a space, or a repository
//! that does not start with a letter, would be split wrongly in those forms.
//! Such values display with a leading delimiter instead.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{IdentityError, IdentityResult};

/// Delimiter used when the input does not start with its own.
pub const DEFAULT_DELIM: char = ',';

/// Fallback delimiter for comma-free input, as produced by
/// `SourceVersion`'s `Display`.
pub const DISPLAY_DELIM: char = ' ';

/// Leading delimiters tried, in order, when the plain forms are ambiguous.
const EXPLICIT_DELIMS: [char; 6] = ['|', ';', '#', '!', '^', '~'];

/// Repository + offset: which piece of software, independent of version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SourceLocation {
    /// URL of the source repository.
    pub repo_url: String,
    /// Path within the repository. Empty means the repository root.
    pub repo_offset: String,
}

/// A `SourceLocation` plus a semantic version.
///
/// Equality ignores the version's build metadata, which holds the revision.
#[derive(Debug, Clone)]
pub struct SourceVersion {
    pub repo_url: String,
    pub version: Version,
    pub repo_offset: String,
}

/// Result of the generic parser: either identity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityName {
    Location(SourceLocation),
    Version(SourceVersion),
}

impl SourceLocation {
    pub fn new(repo_url: impl Into<String>, repo_offset: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            repo_offset: repo_offset.into(),
        }
    }

    /// Parse a bare location. Strings carrying a version are rejected.
    pub fn parse(source: &str) -> IdentityResult<Self> {
        location_from_chunks(source, &parse_chunks(source))
    }

    pub fn repo(&self) -> &str {
        &self.repo_url
    }

    /// Build the `SourceVersion` of this location at `version`.
    pub fn source_version(&self, version: Version) -> SourceVersion {
        SourceVersion {
            repo_url: self.repo_url.clone(),
            version,
            repo_offset: self.repo_offset.clone(),
        }
    }
}

impl SourceVersion {
    pub fn new(
        repo_url: impl Into<String>,
        version: Version,
        repo_offset: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            version,
            repo_offset: repo_offset.into(),
        }
    }

    pub fn parse(source: &str) -> IdentityResult<Self> {
        version_from_chunks(source, &parse_chunks(source))
    }

    pub fn repo(&self) -> &str {
        &self.repo_url
    }

    /// Project down to the version-independent location.
    pub fn canonical_name(&self) -> SourceLocation {
        SourceLocation {
            repo_url: self.repo_url.clone(),
            repo_offset: self.repo_offset.clone(),
        }
    }

    /// The revision id carried in the version's build metadata.
    pub fn rev_id(&self) -> &str {
        self.version.build.as_str()
    }

    /// `major.minor.patch[-pre]`, without build metadata.
    pub fn tag_name(&self) -> String {
        short_version(&self.version)
    }
}

impl EntityName {
    /// Parse either identity kind, dispatching on the number of chunks.
    pub fn parse(source: &str) -> IdentityResult<Self> {
        let chunks = parse_chunks(source);
        match chunks.len() {
            3 => version_from_chunks(source, &chunks).map(EntityName::Version),
            2 => location_from_chunks(source, &chunks).map(EntityName::Location),
            n => Err(IdentityError::Arity {
                parsing: source.to_string(),
                chunks: n,
            }),
        }
    }

    pub fn repo(&self) -> &str {
        match self {
            EntityName::Location(sl) => sl.repo(),
            EntityName::Version(sv) => sv.repo(),
        }
    }
}

impl PartialEq for SourceVersion {
    fn eq(&self, other: &Self) -> bool {
        self.repo_url == other.repo_url
            && self.repo_offset == other.repo_offset
            && versions_equal(&self.version, &other.version)
    }
}

impl Eq for SourceVersion {}

/// Semantic equality: numeric components and pre-release, not build metadata.
pub fn versions_equal(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor && a.patch == b.patch && a.pre == b.pre
}

/// Format a version as `major.minor.patch[-pre]`.
pub fn short_version(v: &Version) -> String {
    if v.pre.is_empty() {
        format!("{}.{}.{}", v.major, v.minor, v.patch)
    } else {
        format!("{}.{}.{}-{}", v.major, v.minor, v.patch, v.pre)
    }
}

// ── String forms ───────────────────────────────────────────────────

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![self.repo_url.as_str()];
        if !self.repo_offset.is_empty() {
            parts.push(self.repo_offset.as_str());
        }
        write_chunks(f, &parts, DEFAULT_DELIM)
    }
}

impl fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.version.to_string();
        let mut parts = vec![self.repo_url.as_str(), version.as_str()];
        if !self.repo_offset.is_empty() {
            parts.push(self.repo_offset.as_str());
        }
        write_chunks(f, &parts, DISPLAY_DELIM)
    }
}

/// Join `parts` with `plain`, or with a leading explicit delimiter when the
/// plain form would not parse back into the same parts.
fn write_chunks(f: &mut fmt::Formatter<'_>, parts: &[&str], plain: char) -> fmt::Result {
    let ambiguous = !parts[0].starts_with(|c: char| c.is_ascii_alphabetic())
        || parts
            .iter()
            .any(|p| p.contains(DEFAULT_DELIM) || p.contains(DISPLAY_DELIM));
    let explicit = EXPLICIT_DELIMS
        .into_iter()
        .find(|d| parts.iter().all(|p| !p.contains(*d)));

    match explicit {
        Some(delim) if ambiguous => {
            for part in parts {
                write!(f, "{delim}{part}")?;
            }
            Ok(())
        }
        _ => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, "{plain}")?;
                }
                f.write_str(part)?;
            }
            Ok(())
        }
    }
}

impl FromStr for SourceLocation {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for SourceVersion {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SourceLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for SourceVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ── Chunk parsing ──────────────────────────────────────────────────

fn parse_chunks(source: &str) -> Vec<&str> {
    let mut chars = source.chars();
    match chars.next() {
        None => vec![""],
        Some(delim) if !delim.is_ascii_alphabetic() => chars.as_str().split(delim).collect(),
        Some(_) if source.contains(DEFAULT_DELIM) => source.split(DEFAULT_DELIM).collect(),
        Some(_) => source.split(DISPLAY_DELIM).collect(),
    }
}

fn version_from_chunks(source: &str, chunks: &[&str]) -> IdentityResult<SourceVersion> {
    let repo = chunks.first().copied().unwrap_or_default();
    if repo.is_empty() {
        return Err(IdentityError::MissingRepo {
            parsing: source.to_string(),
        });
    }
    if chunks.len() > 3 {
        return Err(IdentityError::Arity {
            parsing: source.to_string(),
            chunks: chunks.len(),
        });
    }

    let version_str = chunks.get(1).copied().unwrap_or_default();
    if version_str.is_empty() {
        return Err(IdentityError::MissingVersion {
            repo: repo.to_string(),
            parsing: source.to_string(),
        });
    }
    let version = Version::parse(version_str).map_err(|e| IdentityError::Version {
        parsing: source.to_string(),
        source: e,
    })?;

    let repo_offset = match chunks.get(2) {
        Some(offset) if offset.is_empty() => {
            return Err(IdentityError::MissingPath {
                repo: repo.to_string(),
                parsing: source.to_string(),
            });
        }
        Some(offset) => offset.to_string(),
        None => String::new(),
    };

    Ok(SourceVersion {
        repo_url: repo.to_string(),
        version,
        repo_offset,
    })
}

fn location_from_chunks(source: &str, chunks: &[&str]) -> IdentityResult<SourceLocation> {
    if chunks.len() > 2 {
        return Err(IdentityError::IncludesVersion {
            parsing: source.to_string(),
        });
    }

    let repo = chunks.first().copied().unwrap_or_default();
    if repo.is_empty() {
        return Err(IdentityError::MissingRepo {
            parsing: source.to_string(),
        });
    }

    Ok(SourceLocation {
        repo_url: repo.to_string(),
        repo_offset: chunks.get(1).copied().unwrap_or_default().to_string(),
    })
}
