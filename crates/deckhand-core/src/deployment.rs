//! Deployment value types.
//!
//! A `Deployment` is one desired-or-actual unit of software on one cluster.
//! Values are built per reconciliation run by the diff producer and consumed
//! once by the rectifier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::SourceVersion;

/// Resource requests (cpus, memory, ports), keyed by resource name.
pub type Resources = BTreeMap<String, String>;

/// Environment variables injected into the container.
pub type Env = BTreeMap<String, String>;

pub type Volumes = Vec<Volume>;

/// A host path mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub host: String,
    pub container: String,
    pub mode: VolumeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeMode {
    #[serde(rename = "RO")]
    ReadOnly,
    #[serde(rename = "RW")]
    ReadWrite,
}

/// The tunable part of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    pub num_instances: u32,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub env: Env,
    #[serde(default)]
    pub volumes: Volumes,
}

/// One software unit on one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub cluster: String,
    /// Explicit scheduler request id. Empty means derive one from the
    /// source location.
    #[serde(default)]
    pub request_id: String,
    pub source_version: SourceVersion,
    #[serde(flatten)]
    pub deploy_config: DeployConfig,
}

/// The before and after of a single modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPair {
    pub prior: Deployment,
    pub post: Deployment,
}

impl Deployment {
    pub fn new(cluster: impl Into<String>, source_version: SourceVersion) -> Self {
        Self {
            cluster: cluster.into(),
            request_id: String::new(),
            source_version,
            deploy_config: DeployConfig::default(),
        }
    }

    pub fn num_instances(&self) -> u32 {
        self.deploy_config.num_instances
    }

    pub fn resources(&self) -> &Resources {
        &self.deploy_config.resources
    }

    pub fn env(&self) -> &Env {
        &self.deploy_config.env
    }

    pub fn volumes(&self) -> &Volumes {
        &self.deploy_config.volumes
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.source_version, self.cluster)
    }
}

impl DeploymentPair {
    pub fn new(prior: Deployment, post: Deployment) -> Self {
        Self { prior, post }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn deployment_json_flattens_config() {
        let mut d = Deployment::new(
            "us-west-1",
            SourceVersion::new("github.com/x/y", Version::new(1, 0, 0), ""),
        );
        d.deploy_config.num_instances = 3;
        d.deploy_config.volumes.push(Volume {
            host: "/var/log".to_string(),
            container: "/logs".to_string(),
            mode: VolumeMode::ReadWrite,
        });

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["num_instances"], 3);
        assert_eq!(json["source_version"], "github.com/x/y 1.0.0");
        assert_eq!(json["volumes"][0]["mode"], "RW");

        let back: Deployment = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn request_id_defaults_to_empty() {
        let json = serde_json::json!({
            "cluster": "c",
            "source_version": "github.com/x/y,1.0.0",
            "num_instances": 1,
        });
        let d: Deployment = serde_json::from_value(json).unwrap();
        assert!(d.request_id.is_empty());
        assert!(d.env().is_empty());
        assert_eq!(d.num_instances(), 1);
    }
}
