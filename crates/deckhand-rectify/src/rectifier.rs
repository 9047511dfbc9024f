//! Rectifier — applies deployment differences to a scheduler.
//!
//! One worker per change kind drains its stream strictly in arrival order.
//! The three workers run concurrently and report failures on a shared error
//! stream. A supervisor joins all three before dropping the last sender, so
//! the stream ends exactly once, after the final error has been delivered.

use std::sync::Arc;

use deckhand_core::{DiffChans, Deployment, DeploymentPair, RectifyConfig};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Span, debug, error, info, info_span, warn};

use crate::client::SchedulerClient;
use crate::error::RectificationError;
use crate::ids::{IdGenerator, UuidIdGenerator, compute_request_id, idify};

/// Errors are handed over one at a time; a slow consumer throttles the workers.
const ERROR_STREAM_CAPACITY: usize = 1;

/// Whether a modification needs the request's instance count changed.
pub fn requires_scale(pair: &DeploymentPair) -> bool {
    pair.prior.num_instances() != pair.post.num_instances()
}

/// Whether a modification needs new code deployed.
pub fn requires_redeploy(pair: &DeploymentPair) -> bool {
    pair.prior.source_version != pair.post.source_version
        || pair.prior.resources() != pair.post.resources()
        || pair.prior.env() != pair.post.env()
}

/// Rectify with a UUID deploy id generator and the default audit messages.
pub fn rectify(
    diffs: DiffChans,
    client: Arc<dyn SchedulerClient>,
) -> mpsc::Receiver<RectificationError> {
    Rectifier::new(client).rectify(diffs)
}

#[derive(Clone)]
pub struct Rectifier {
    client: Arc<dyn SchedulerClient>,
    ids: Arc<dyn IdGenerator>,
    messages: RectifyConfig,
    span: Span,
}

impl Rectifier {
    pub fn new(client: Arc<dyn SchedulerClient>) -> Self {
        Self {
            client,
            ids: Arc::new(UuidIdGenerator),
            messages: RectifyConfig::default(),
            span: info_span!("rectifier"),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Log under `span` instead of the default `rectifier` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Audit messages sent with delete and scale calls.
    pub fn with_messages(mut self, messages: RectifyConfig) -> Self {
        self.messages = messages;
        self
    }

    /// Start applying `diffs` and return the error stream.
    ///
    /// Every item of every stream is attempted. The returned receiver yields
    /// one error per failed item and ends once all three streams have been
    /// drained. Must be called from within a Tokio runtime.
    pub fn rectify(&self, diffs: DiffChans) -> mpsc::Receiver<RectificationError> {
        let (errs_tx, errs_rx) = mpsc::channel(ERROR_STREAM_CAPACITY);
        let DiffChans {
            created,
            deleted,
            modified,
        } = diffs;

        let mut workers = JoinSet::new();
        workers.spawn(self.clone().create_all(created, errs_tx.clone()));
        workers.spawn(self.clone().delete_all(deleted, errs_tx.clone()));
        workers.spawn(self.clone().modify_all(modified, errs_tx.clone()));

        let span = self.span.clone();
        info!(parent: &span, "rectification started");
        tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(parent: &span, error = %e, "rectification worker failed");
                }
            }
            drop(errs_tx);
            info!(parent: &span, "rectification finished");
        });

        errs_rx
    }

    // ── Workers ────────────────────────────────────────────────────

    async fn create_all(
        self,
        mut created: mpsc::Receiver<Deployment>,
        errs: mpsc::Sender<RectificationError>,
    ) {
        while let Some(deployment) = created.recv().await {
            debug!(parent: &self.span, %deployment, "creating");
            if let Err(source) = self.create(&deployment).await {
                self.report(&errs, RectificationError::Create { deployment, source })
                    .await;
            }
        }
    }

    async fn delete_all(
        self,
        mut deleted: mpsc::Receiver<Deployment>,
        errs: mpsc::Sender<RectificationError>,
    ) {
        while let Some(deployment) = deleted.recv().await {
            debug!(parent: &self.span, %deployment, "deleting");
            if let Err(source) = self.delete(&deployment).await {
                self.report(&errs, RectificationError::Delete { deployment, source })
                    .await;
            }
        }
    }

    async fn modify_all(
        self,
        mut modified: mpsc::Receiver<DeploymentPair>,
        errs: mpsc::Sender<RectificationError>,
    ) {
        while let Some(pair) = modified.recv().await {
            debug!(parent: &self.span, prior = %pair.prior, post = %pair.post, "modifying");
            if let Err(source) = self.modify(&pair).await {
                self.report(&errs, RectificationError::Change { pair, source })
                    .await;
            }
        }
    }

    async fn report(&self, errs: &mpsc::Sender<RectificationError>, err: RectificationError) {
        warn!(parent: &self.span, error = %err, "rectification failed");
        if errs.send(err).await.is_err() {
            debug!(parent: &self.span, "error stream dropped by consumer");
        }
    }

    // ── Per-item steps ─────────────────────────────────────────────

    async fn create(&self, deployment: &Deployment) -> anyhow::Result<()> {
        let image_name = self.client.image_name(deployment).await?;
        let request_id = compute_request_id(deployment);

        self.client
            .post_request(&deployment.cluster, &request_id, deployment.num_instances())
            .await?;

        self.client
            .deploy(
                &deployment.cluster,
                &self.new_deploy_id(),
                &request_id,
                &image_name,
                deployment.resources(),
                deployment.env(),
                deployment.volumes(),
            )
            .await
    }

    async fn delete(&self, deployment: &Deployment) -> anyhow::Result<()> {
        self.client
            .delete_request(
                &deployment.cluster,
                &compute_request_id(deployment),
                &self.messages.delete_message,
            )
            .await
    }

    /// Scale first, then redeploy. A failed scale skips the redeploy.
    async fn modify(&self, pair: &DeploymentPair) -> anyhow::Result<()> {
        let DeploymentPair { prior, post } = pair;

        if requires_scale(pair) {
            debug!(
                parent: &self.span,
                from = prior.num_instances(),
                to = post.num_instances(),
                "scaling"
            );
            self.client
                .scale(
                    &post.cluster,
                    &compute_request_id(post),
                    post.num_instances(),
                    &self.messages.scale_message,
                )
                .await?;
        }

        if requires_redeploy(pair) {
            let image_name = self.client.image_name(post).await?;
            debug!(parent: &self.span, %image_name, "redeploying");
            self.client
                .deploy(
                    &post.cluster,
                    &self.new_deploy_id(),
                    &compute_request_id(prior),
                    &image_name,
                    post.resources(),
                    post.env(),
                    post.volumes(),
                )
                .await?;
        }

        Ok(())
    }

    fn new_deploy_id(&self) -> String {
        idify(&self.ids.new_id())
    }
}
