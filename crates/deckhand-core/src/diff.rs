//! The three change streams a diff producer hands to the rectifier.

use tokio::sync::mpsc;

use crate::deployment::{Deployment, DeploymentPair};

/// Receiving ends of the created/deleted/modified streams.
///
/// Each stream ends when its sender is dropped.
#[derive(Debug)]
pub struct DiffChans {
    pub created: mpsc::Receiver<Deployment>,
    pub deleted: mpsc::Receiver<Deployment>,
    pub modified: mpsc::Receiver<DeploymentPair>,
}

/// Sending ends, held by the diff producer.
#[derive(Debug, Clone)]
pub struct DiffSenders {
    pub created: mpsc::Sender<Deployment>,
    pub deleted: mpsc::Sender<Deployment>,
    pub modified: mpsc::Sender<DeploymentPair>,
}

impl DiffChans {
    /// Create the three streams, each bounded to `capacity`.
    pub fn channel(capacity: usize) -> (DiffSenders, DiffChans) {
        let (created_tx, created) = mpsc::channel(capacity);
        let (deleted_tx, deleted) = mpsc::channel(capacity);
        let (modified_tx, modified) = mpsc::channel(capacity);
        (
            DiffSenders {
                created: created_tx,
                deleted: deleted_tx,
                modified: modified_tx,
            },
            DiffChans {
                created,
                deleted,
                modified,
            },
        )
    }

    /// Streams pre-filled with the given items and already closed.
    ///
    /// Convenient when the whole diff is known up front.
    pub fn from_items(
        created: Vec<Deployment>,
        deleted: Vec<Deployment>,
        modified: Vec<DeploymentPair>,
    ) -> DiffChans {
        let (senders, chans) = DiffChans::channel(
            created.len().max(deleted.len()).max(modified.len()).max(1),
        );
        for d in created {
            // Capacity covers every item, so try_send cannot fail.
            let _ = senders.created.try_send(d);
        }
        for d in deleted {
            let _ = senders.deleted.try_send(d);
        }
        for pair in modified {
            let _ = senders.modified.try_send(pair);
        }
        chans
    }
}
