//! deckhand-core — value types shared across Deckhand crates.
//!
//! - **`source`** — `SourceLocation` / `SourceVersion` and their string forms
//! - **`docker`** — image labels and image names derived from source versions
//! - **`deployment`** — `Deployment` and `DeploymentPair`
//! - **`diff`** — the created/deleted/modified streams consumed by the rectifier
//! - **`config`** — `deckhand.toml` parsing

pub mod config;
pub mod deployment;
pub mod diff;
pub mod docker;
pub mod error;
pub mod source;

pub use config::{DeckhandConfig, NameCacheConfig, RectifyConfig};
pub use deployment::*;
pub use diff::{DiffChans, DiffSenders};
pub use docker::Labels;
pub use error::{IdentityError, IdentityResult};
pub use semver::Version;
pub use source::{EntityName, SourceLocation, SourceVersion};
