//! Rectification error types.

use deckhand_core::{Deployment, DeploymentPair};
use thiserror::Error;

/// A single item that could not be rectified.
///
/// These are reported on the rectifier's output stream rather than returned;
/// one failing item never stops the rest of the run.
#[derive(Debug, Error)]
pub enum RectificationError {
    #[error("couldn't create deployment {deployment}: {source}")]
    Create {
        deployment: Deployment,
        source: anyhow::Error,
    },

    #[error("couldn't delete deployment {deployment}: {source}")]
    Delete {
        deployment: Deployment,
        source: anyhow::Error,
    },

    #[error(
        "couldn't change from deployment {} to deployment {}: {source}",
        .pair.prior,
        .pair.post
    )]
    Change {
        pair: DeploymentPair,
        source: anyhow::Error,
    },
}

impl RectificationError {
    /// The deployment as it was before rectification, if there was one.
    pub fn existing_deployment(&self) -> Option<&Deployment> {
        match self {
            Self::Create { .. } => None,
            Self::Delete { deployment, .. } => Some(deployment),
            Self::Change { pair, .. } => Some(&pair.prior),
        }
    }

    /// The deployment rectification was trying to reach, if any.
    pub fn intended_deployment(&self) -> Option<&Deployment> {
        match self {
            Self::Create { deployment, .. } => Some(deployment),
            Self::Delete { .. } => None,
            Self::Change { pair, .. } => Some(&pair.post),
        }
    }
}

pub type RectifyResult<T> = Result<T, RectificationError>;
