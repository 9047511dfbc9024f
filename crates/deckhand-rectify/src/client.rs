//! Scheduler client capability consumed by the rectifier.

use async_trait::async_trait;
use deckhand_core::{Deployment, Env, Labels, Resources, Volumes};
use deckhand_names::ImageMapper;

/// The imperative scheduler API.
///
/// The concrete HTTP client lives outside this crate. Failures are opaque
/// to the rectifier, which only records them against the item being applied.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Deploy `image_name` under an existing request.
    #[allow(clippy::too_many_arguments)]
    async fn deploy(
        &self,
        cluster: &str,
        deploy_id: &str,
        request_id: &str,
        image_name: &str,
        resources: &Resources,
        env: &Env,
        volumes: &Volumes,
    ) -> anyhow::Result<()>;

    /// Create a request with `instance_count` instances.
    async fn post_request(
        &self,
        cluster: &str,
        request_id: &str,
        instance_count: u32,
    ) -> anyhow::Result<()>;

    async fn scale(
        &self,
        cluster: &str,
        request_id: &str,
        instance_count: u32,
        message: &str,
    ) -> anyhow::Result<()>;

    async fn delete_request(
        &self,
        cluster: &str,
        request_id: &str,
        message: &str,
    ) -> anyhow::Result<()>;

    /// The image to run for a deployment.
    async fn image_name(&self, deployment: &Deployment) -> anyhow::Result<String>;

    /// The labels of a built image.
    async fn image_labels(&self, image_name: &str) -> anyhow::Result<Labels>;
}

/// Answers image questions from a name cache and forwards everything else.
#[derive(Debug, Clone)]
pub struct CachedImageClient<C, M> {
    inner: C,
    names: M,
}

impl<C, M> CachedImageClient<C, M> {
    pub fn new(inner: C, names: M) -> Self {
        Self { inner, names }
    }
}

#[async_trait]
impl<C, M> SchedulerClient for CachedImageClient<C, M>
where
    C: SchedulerClient,
    M: ImageMapper,
{
    #[allow(clippy::too_many_arguments)]
    async fn deploy(
        &self,
        cluster: &str,
        deploy_id: &str,
        request_id: &str,
        image_name: &str,
        resources: &Resources,
        env: &Env,
        volumes: &Volumes,
    ) -> anyhow::Result<()> {
        self.inner
            .deploy(cluster, deploy_id, request_id, image_name, resources, env, volumes)
            .await
    }

    async fn post_request(
        &self,
        cluster: &str,
        request_id: &str,
        instance_count: u32,
    ) -> anyhow::Result<()> {
        self.inner.post_request(cluster, request_id, instance_count).await
    }

    async fn scale(
        &self,
        cluster: &str,
        request_id: &str,
        instance_count: u32,
        message: &str,
    ) -> anyhow::Result<()> {
        self.inner
            .scale(cluster, request_id, instance_count, message)
            .await
    }

    async fn delete_request(
        &self,
        cluster: &str,
        request_id: &str,
        message: &str,
    ) -> anyhow::Result<()> {
        self.inner.delete_request(cluster, request_id, message).await
    }

    async fn image_name(&self, deployment: &Deployment) -> anyhow::Result<String> {
        Ok(self.names.get_image_name(&deployment.source_version).await?)
    }

    async fn image_labels(&self, image_name: &str) -> anyhow::Result<Labels> {
        let sv = self.names.get_source_version(image_name).await?;
        Ok(sv.docker_labels())
    }
}
