//! Typed wrapper over the container orchestrator.
//!
//! A deletion that returns "not found" is idempotent success, not an error —
//! every `delete_*` method on this trait upholds that contract itself, so
//! callers (the Lifecycle Engine's compensation and termination paths) never
//! have to special-case 404s.

pub mod objects;

mod fake;
mod kube_client;

pub use fake::FakeOrchestratorClient;
pub use kube_client::KubeOrchestratorClient;

use async_trait::async_trait;
use sessionctl_core::profile::Profile;
use sessionctl_core::types::ResourceSpec;
use sessionctl_core::{ControlPlaneError, Session};

/// Current state of a session's deployment, as last observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentStatus {
    pub spec_replicas: i32,
    pub ready_replicas: i32,
}

impl DeploymentStatus {
    pub fn has_ready_replica(&self) -> bool {
        self.ready_replicas >= 1
    }
}

/// Terminal state of a batch job, as observed by the backup poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    async fn create_claim(&self, uuid: &str, session: &Session, profile: &Profile) -> Result<(), ControlPlaneError>;
    async fn create_deployment(
        &self,
        uuid: &str,
        session: &Session,
        profile: &Profile,
        pod_image: &str,
        pod_port: u16,
    ) -> Result<(), ControlPlaneError>;
    async fn create_service(&self, uuid: &str, session: &Session, pod_port: u16) -> Result<(), ControlPlaneError>;
    async fn create_ingress(&self, uuid: &str, session: &Session, profile: &Profile) -> Result<(), ControlPlaneError>;

    /// `None` if the deployment does not exist.
    async fn get_deployment_status(&self, uuid: &str) -> Result<Option<DeploymentStatus>, ControlPlaneError>;
    async fn patch_deployment_replicas(&self, uuid: &str, replicas: i32) -> Result<(), ControlPlaneError>;
    async fn patch_deployment_resources(&self, uuid: &str, resources: ResourceSpec) -> Result<(), ControlPlaneError>;

    async fn delete_deployment(&self, uuid: &str) -> Result<(), ControlPlaneError>;
    async fn delete_service(&self, uuid: &str) -> Result<(), ControlPlaneError>;
    async fn delete_ingress(&self, uuid: &str) -> Result<(), ControlPlaneError>;
    async fn delete_claim(&self, uuid: &str) -> Result<(), ControlPlaneError>;

    async fn create_autoscaler_trigger(&self, uuid: &str, session: &Session) -> Result<(), ControlPlaneError>;
    async fn delete_autoscaler_trigger(&self, uuid: &str) -> Result<(), ControlPlaneError>;

    async fn create_backup_job(&self, uuid: &str, session: &Session) -> Result<(), ControlPlaneError>;
    async fn get_job_status(&self, job_name: &str) -> Result<Option<JobStatus>, ControlPlaneError>;
    async fn delete_job(&self, job_name: &str) -> Result<(), ControlPlaneError>;
}
