//! In-memory fake orchestrator client, the test substitution seam for
//! [`OrchestratorClient`]. Tracks created object names and replica/resource
//! state per session without touching a real cluster.

use crate::{DeploymentStatus, JobStatus, OrchestratorClient};
use async_trait::async_trait;
use parking_lot::RwLock;
use sessionctl_core::profile::Profile;
use sessionctl_core::types::ResourceSpec;
use sessionctl_core::{naming, ControlPlaneError, Session};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct FakeDeployment {
    replicas: i32,
    ready_replicas: i32,
    resources: ResourceSpec,
}

#[derive(Default)]
struct Inner {
    claims: HashSet<String>,
    deployments: HashMap<String, FakeDeployment>,
    services: HashSet<String>,
    ingresses: HashSet<String>,
    autoscaler_triggers: HashSet<String>,
    jobs: HashMap<String, JobStatus>,
}

/// Deterministic in-memory stand-in for the cluster, used by lifecycle and
/// gateway tests. New deployments start with one ready replica so wake/create
/// flows observe readiness without a separate "mark ready" step; tests that
/// need to exercise the not-yet-ready path call [`FakeOrchestratorClient::set_ready_replicas`].
#[derive(Default)]
pub struct FakeOrchestratorClient {
    inner: RwLock<Inner>,
}

impl FakeOrchestratorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready_replicas(&self, uuid: &str, ready: i32) {
        if let Some(deployment) = self.inner.write().deployments.get_mut(&naming::deployment_name(uuid)) {
            deployment.ready_replicas = ready;
        }
    }

    pub fn set_job_status(&self, job_name: &str, status: JobStatus) {
        self.inner.write().jobs.insert(job_name.to_string(), status);
    }

    pub fn has_deployment(&self, uuid: &str) -> bool {
        self.inner.read().deployments.contains_key(&naming::deployment_name(uuid))
    }

    pub fn has_claim(&self, uuid: &str) -> bool {
        self.inner.read().claims.contains(&naming::claim_name(uuid))
    }

    pub fn resources_of(&self, uuid: &str) -> Option<ResourceSpec> {
        self.inner.read().deployments.get(&naming::deployment_name(uuid)).map(|d| d.resources)
    }
}

#[async_trait]
impl OrchestratorClient for FakeOrchestratorClient {
    async fn create_claim(&self, uuid: &str, _session: &Session, _profile: &Profile) -> Result<(), ControlPlaneError> {
        self.inner.write().claims.insert(naming::claim_name(uuid));
        Ok(())
    }

    async fn create_deployment(
        &self,
        uuid: &str,
        _session: &Session,
        profile: &Profile,
        _pod_image: &str,
        _pod_port: u16,
    ) -> Result<(), ControlPlaneError> {
        self.inner.write().deployments.insert(
            naming::deployment_name(uuid),
            FakeDeployment { replicas: 1, ready_replicas: 1, resources: profile.base_resources },
        );
        Ok(())
    }

    async fn create_service(&self, uuid: &str, _session: &Session, _pod_port: u16) -> Result<(), ControlPlaneError> {
        self.inner.write().services.insert(naming::service_name(uuid));
        Ok(())
    }

    async fn create_ingress(&self, uuid: &str, _session: &Session, _profile: &Profile) -> Result<(), ControlPlaneError> {
        self.inner.write().ingresses.insert(naming::ingress_name(uuid));
        Ok(())
    }

    async fn get_deployment_status(&self, uuid: &str) -> Result<Option<DeploymentStatus>, ControlPlaneError> {
        Ok(self
            .inner
            .read()
            .deployments
            .get(&naming::deployment_name(uuid))
            .map(|d| DeploymentStatus { spec_replicas: d.replicas, ready_replicas: d.ready_replicas }))
    }

    async fn patch_deployment_replicas(&self, uuid: &str, replicas: i32) -> Result<(), ControlPlaneError> {
        let mut inner = self.inner.write();
        let Some(deployment) = inner.deployments.get_mut(&naming::deployment_name(uuid)) else {
            return Err(ControlPlaneError::OrchestratorError(format!("no deployment for {uuid}")));
        };
        deployment.replicas = replicas;
        deployment.ready_replicas = deployment.ready_replicas.min(replicas);
        Ok(())
    }

    async fn patch_deployment_resources(&self, uuid: &str, resources: ResourceSpec) -> Result<(), ControlPlaneError> {
        let mut inner = self.inner.write();
        let Some(deployment) = inner.deployments.get_mut(&naming::deployment_name(uuid)) else {
            return Err(ControlPlaneError::OrchestratorError(format!("no deployment for {uuid}")));
        };
        deployment.resources = resources;
        Ok(())
    }

    async fn delete_deployment(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().deployments.remove(&naming::deployment_name(uuid));
        Ok(())
    }

    async fn delete_service(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().services.remove(&naming::service_name(uuid));
        Ok(())
    }

    async fn delete_ingress(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().ingresses.remove(&naming::ingress_name(uuid));
        Ok(())
    }

    async fn delete_claim(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().claims.remove(&naming::claim_name(uuid));
        Ok(())
    }

    async fn create_autoscaler_trigger(&self, uuid: &str, _session: &Session) -> Result<(), ControlPlaneError> {
        self.inner.write().autoscaler_triggers.insert(naming::autoscaler_trigger_name(uuid));
        Ok(())
    }

    async fn delete_autoscaler_trigger(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().autoscaler_triggers.remove(&naming::autoscaler_trigger_name(uuid));
        Ok(())
    }

    async fn create_backup_job(&self, uuid: &str, _session: &Session) -> Result<(), ControlPlaneError> {
        self.inner.write().jobs.insert(naming::backup_job_name(uuid), JobStatus::Running);
        Ok(())
    }

    async fn get_job_status(&self, job_name: &str) -> Result<Option<JobStatus>, ControlPlaneError> {
        Ok(self.inner.read().jobs.get(job_name).copied())
    }

    async fn delete_job(&self, job_name: &str) -> Result<(), ControlPlaneError> {
        self.inner.write().jobs.remove(job_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionctl_core::Session;

    fn sample_session() -> Session {
        Session::new("abcd1234".to_string(), "alice".to_string())
    }

    #[tokio::test]
    async fn create_then_delete_is_idempotent() {
        let client = FakeOrchestratorClient::new();
        let session = sample_session();
        let profile = Profile::new("user", "preview.example");
        client.create_deployment("abcd1234", &session, &profile, "image:latest", 8080).await.unwrap();
        assert!(client.has_deployment("abcd1234"));
        client.delete_deployment("abcd1234").await.unwrap();
        assert!(!client.has_deployment("abcd1234"));
        // deleting again is still Ok, matching the real client's 404-as-success contract
        client.delete_deployment("abcd1234").await.unwrap();
    }

    #[tokio::test]
    async fn patch_replicas_caps_ready_replicas_on_scale_down() {
        let client = FakeOrchestratorClient::new();
        let session = sample_session();
        let profile = Profile::new("user", "preview.example");
        client.create_deployment("abcd1234", &session, &profile, "image:latest", 8080).await.unwrap();
        client.patch_deployment_replicas("abcd1234", 0).await.unwrap();
        let status = client.get_deployment_status("abcd1234").await.unwrap().unwrap();
        assert_eq!(status.spec_replicas, 0);
        assert_eq!(status.ready_replicas, 0);
    }

    #[tokio::test]
    async fn patch_resources_updates_tracked_spec() {
        let client = FakeOrchestratorClient::new();
        let session = sample_session();
        let profile = Profile::new("user", "preview.example");
        client.create_deployment("abcd1234", &session, &profile, "image:latest", 8080).await.unwrap();
        client.patch_deployment_resources("abcd1234", profile.scale_up_resources).await.unwrap();
        assert_eq!(client.resources_of("abcd1234").unwrap().requests_cpu, profile.scale_up_resources.requests_cpu);
    }

    #[tokio::test]
    async fn backup_job_status_transitions() {
        let client = FakeOrchestratorClient::new();
        let session = sample_session();
        client.create_backup_job("abcd1234", &session).await.unwrap();
        let job_name = naming::backup_job_name("abcd1234");
        assert_eq!(client.get_job_status(&job_name).await.unwrap(), Some(JobStatus::Running));
        client.set_job_status(&job_name, JobStatus::Succeeded);
        assert_eq!(client.get_job_status(&job_name).await.unwrap(), Some(JobStatus::Succeeded));
    }
}
