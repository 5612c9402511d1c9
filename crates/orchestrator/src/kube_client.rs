//! Kubernetes-backed orchestrator client.
//!
//! Follows the same shape as a typed `kube-rs` adapter: a shared `kube::Client`
//! acquired once at startup (in-cluster discovery, falling back to the local
//! kubeconfig), `Api<T>::namespaced` per call, explicit `PostParams`/
//! `DeleteParams`/`Patch`, and "not found" treated as success on delete.

use crate::objects;
use crate::{DeploymentStatus, JobStatus, OrchestratorClient};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use sessionctl_core::profile::Profile;
use sessionctl_core::types::ResourceSpec;
use sessionctl_core::{naming, ControlPlaneError, Session};

/// Shared backup claim every session's backup job mounts read-write.
const BACKUP_CLAIM_NAME: &str = "session-backups";
const BACKUP_IMAGE: &str = "alpine:3.20";

pub struct KubeOrchestratorClient {
    client: Client,
    namespace: String,
}

impl KubeOrchestratorClient {
    /// Acquires credentials once (in-cluster, falling back to local
    /// kubeconfig). Failure here is fatal at startup time only — once
    /// constructed this client never re-attempts discovery.
    pub async fn connect(namespace: impl Into<String>) -> Result<Self, ControlPlaneError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ControlPlaneError::Internal(format!("failed to create kube client: {e}")))?;
        Ok(Self { client, namespace: namespace.into() })
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
    fn ingresses(&self) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
    fn claims(&self) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
    fn jobs(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
    fn secrets(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn map_err(e: kube::Error) -> ControlPlaneError {
        ControlPlaneError::OrchestratorError(e.to_string())
    }

    fn is_not_found(e: &kube::Error) -> bool {
        matches!(e, kube::Error::Api(resp) if resp.code == 404)
    }
}

/// Deletes `name` idempotently: "not found" is success, any other failure
/// propagates as an `OrchestratorError`.
async fn delete_idempotent<T>(api: &Api<T>, name: &str, params: &DeleteParams) -> Result<(), ControlPlaneError>
where
    T: kube::Resource<Scope = kube::core::NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + for<'de> serde::Deserialize<'de>,
{
    match api.delete(name, params).await {
        Ok(_) => Ok(()),
        Err(e) if KubeOrchestratorClient::is_not_found(&e) => Ok(()),
        Err(e) => Err(KubeOrchestratorClient::map_err(e)),
    }
}

#[async_trait]
impl OrchestratorClient for KubeOrchestratorClient {
    async fn create_claim(&self, uuid: &str, session: &Session, profile: &Profile) -> Result<(), ControlPlaneError> {
        let claim = objects::build_claim(uuid, session, profile);
        self.claims().create(&PostParams::default(), &claim).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn create_deployment(
        &self,
        uuid: &str,
        session: &Session,
        profile: &Profile,
        pod_image: &str,
        pod_port: u16,
    ) -> Result<(), ControlPlaneError> {
        let deployment = objects::build_deployment(uuid, session, profile, pod_image, pod_port, profile.base_resources);
        self.deployments().create(&PostParams::default(), &deployment).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn create_service(&self, uuid: &str, session: &Session, pod_port: u16) -> Result<(), ControlPlaneError> {
        let service = objects::build_service(uuid, session, pod_port);
        self.services().create(&PostParams::default(), &service).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn create_ingress(&self, uuid: &str, session: &Session, profile: &Profile) -> Result<(), ControlPlaneError> {
        let ingress = objects::build_ingress(uuid, session, profile);
        self.ingresses().create(&PostParams::default(), &ingress).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_deployment_status(&self, uuid: &str) -> Result<Option<DeploymentStatus>, ControlPlaneError> {
        match self.deployments().get(&naming::deployment_name(uuid)).await {
            Ok(deployment) => {
                let spec_replicas = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
                let ready_replicas = deployment.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
                Ok(Some(DeploymentStatus { spec_replicas, ready_replicas }))
            }
            Err(e) if Self::is_not_found(&e) => Ok(None),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn patch_deployment_replicas(&self, uuid: &str, replicas: i32) -> Result<(), ControlPlaneError> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        self.deployments()
            .patch(&naming::deployment_name(uuid), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn patch_deployment_resources(&self, uuid: &str, resources: ResourceSpec) -> Result<(), ControlPlaneError> {
        let patch = serde_json::json!({
            "spec": {
                "template": {
                    "spec": {
                        "containers": [{
                            "name": "user-pod",
                            "resources": {
                                "requests": {
                                    "memory": resources.requests_memory,
                                    "cpu": resources.requests_cpu,
                                },
                                "limits": {
                                    "memory": resources.limits_memory,
                                    "cpu": resources.limits_cpu,
                                }
                            }
                        }]
                    }
                }
            }
        });
        self.deployments()
            .patch(&naming::deployment_name(uuid), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_deployment(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        let params = DeleteParams { grace_period_seconds: Some(30), ..Default::default() };
        delete_idempotent(&self.deployments(), &naming::deployment_name(uuid), &params).await
    }

    async fn delete_service(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        delete_idempotent(&self.services(), &naming::service_name(uuid), &DeleteParams::default()).await
    }

    async fn delete_ingress(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        delete_idempotent(&self.ingresses(), &naming::ingress_name(uuid), &DeleteParams::default()).await
    }

    async fn delete_claim(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        delete_idempotent(&self.claims(), &naming::claim_name(uuid), &DeleteParams::default()).await
    }

    async fn create_autoscaler_trigger(&self, uuid: &str, session: &Session) -> Result<(), ControlPlaneError> {
        let secret = objects::build_autoscaler_trigger(uuid, session);
        self.secrets().create(&PostParams::default(), &secret).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_autoscaler_trigger(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        delete_idempotent(&self.secrets(), &naming::autoscaler_trigger_name(uuid), &DeleteParams::default()).await
    }

    async fn create_backup_job(&self, uuid: &str, session: &Session) -> Result<(), ControlPlaneError> {
        let job = objects::build_backup_job(uuid, session, BACKUP_CLAIM_NAME, BACKUP_IMAGE);
        self.jobs().create(&PostParams::default(), &job).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_job_status(&self, job_name: &str) -> Result<Option<JobStatus>, ControlPlaneError> {
        match self.jobs().get(job_name).await {
            Ok(job) => {
                let status = job.status.unwrap_or_default();
                if status.succeeded.unwrap_or(0) > 0 {
                    Ok(Some(JobStatus::Succeeded))
                } else if status.failed.unwrap_or(0) > 0 {
                    Ok(Some(JobStatus::Failed))
                } else {
                    Ok(Some(JobStatus::Running))
                }
            }
            Err(e) if Self::is_not_found(&e) => Ok(None),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn delete_job(&self, job_name: &str) -> Result<(), ControlPlaneError> {
        let params = DeleteParams::background();
        delete_idempotent(&self.jobs(), job_name, &params).await
    }
}
