//! deckhand-names — cache mapping source versions to container image names.
//!
//! Backed by SQLite through [sqlx](https://docs.rs/sqlx). The cache answers
//! two questions: which image was built from a given source version, and
//! which source version a given image was built from. Misses are resolved
//! against a [`RegistryClient`] and written back.
//!
//! # Architecture
//!
//! [`NameStore`] owns the database. [`NameCache`] layers the registry
//! read-through and the harvest-on-miss behaviour on top and implements
//! [`ImageMapper`] for consumers that only need the mapping.
//!
//! Both are `Clone` + `Send` + `Sync` and can be shared across async tasks.

pub mod cache;
pub mod error;
pub mod reference;
pub mod registry;
pub mod schema;
pub mod store;

pub use cache::{ImageMapper, NameCache};
pub use error::{NameCacheError, NameCacheResult};
pub use reference::ImageRef;
pub use registry::{ImageMetadata, OfflineRegistry, RegistryClient, RegistryError};
pub use store::{CachedName, NameStore};
