//! deckhand-rectify — applies deployment differences to a scheduler.
//!
//! A diff producer hands over three streams (created, deleted, modified).
//! The rectifier drains them concurrently, turning each entry into scheduler
//! calls, and reports per-item failures on a single error stream:
//!
//! - Created: resolve the image, post the request, deploy
//! - Deleted: delete the request
//! - Modified: scale if the instance count changed, then redeploy if the
//!   source version, resources or env changed
//!
//! # Architecture
//!
//! ```text
//! Rectifier
//!   ├── create worker ─┐
//!   ├── delete worker ─┼── SchedulerClient (deploy, post, scale, delete, image_name)
//!   ├── modify worker ─┘
//!   └── supervisor (joins the workers, then closes the error stream)
//! ```
//!
//! `CachedImageClient` answers image lookups from a `deckhand_names::NameCache`.

pub mod client;
pub mod error;
pub mod ids;
pub mod rectifier;

pub use client::{CachedImageClient, SchedulerClient};
pub use error::{RectificationError, RectifyResult};
pub use ids::{IdGenerator, UuidIdGenerator, compute_request_id, idify};
pub use rectifier::{Rectifier, rectify, requires_redeploy, requires_scale};
