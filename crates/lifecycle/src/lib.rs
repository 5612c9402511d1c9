//! Lifecycle Engine: the state machine and compensation logic for create,
//! wake, sleep, scale, chat, and terminate.
//!
//! Every operation goes through the [`SessionRegistry`] for its store-backed
//! bookkeeping and the [`OrchestratorClient`] for its cluster effects. Create
//! is the only operation with multi-step compensation: a failure partway
//! through tears down everything already created, in reverse order, before
//! the session record is ever written.

use sessionctl_core::naming;
use sessionctl_core::profile::Profile;
use sessionctl_core::types::ScaleDirection;
use sessionctl_core::{ControlPlaneError, Session, SessionStatus};
use sessionctl_orchestrator::OrchestratorClient;
use sessionctl_registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How long the chat fast path waits for a woken pod before falling back to
/// "queued".
const CHAT_WAKE_GRACE: Duration = Duration::from_millis(500);
const CHAT_FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// How long termination waits for the backup job, in 5-second polls.
const BACKUP_POLL_INTERVAL: Duration = Duration::from_secs(5);
const BACKUP_POLL_ATTEMPTS: u32 = 12;

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub uuid: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub workspace_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Processed(String),
    Queued,
}

/// Objects created so far during a session creation attempt, in creation
/// order. On failure these are torn down in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provisioned {
    Claim,
    Deployment,
    Service,
    Ingress,
}

pub struct LifecycleEngine {
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<dyn OrchestratorClient>,
    profile: Profile,
    pod_image: String,
    pod_port: u16,
    http_client: reqwest::Client,
}

impl LifecycleEngine {
    pub fn new(
        registry: Arc<SessionRegistry>,
        orchestrator: Arc<dyn OrchestratorClient>,
        profile: Profile,
        pod_image: String,
        pod_port: u16,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(CHAT_FORWARD_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        Self { registry, orchestrator, profile, pod_image, pod_port, http_client }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, user_id: &str) -> Result<CreatedSession, ControlPlaneError> {
        if user_id.trim().is_empty() {
            return Err(ControlPlaneError::ValidationError("user_id must not be empty".to_string()));
        }

        let uuid = naming::new_session_uuid();
        let session = Session::new(uuid.clone(), user_id.to_string());
        let mut provisioned = Vec::new();

        let result = self.provision(&uuid, &session, &mut provisioned).await;
        if let Err(err) = result {
            self.compensate(&uuid, &provisioned).await;
            return Err(err);
        }

        self.registry.create(&uuid, user_id).await?;
        self.registry
            .record_event(&uuid, "session_created", serde_json::json!({ "user_id": user_id }))
            .await?;

        info!(uuid, user_id, "session created");
        Ok(CreatedSession {
            uuid: uuid.clone(),
            user_id: user_id.to_string(),
            status: SessionStatus::Created,
            created_at: session.created_at,
            workspace_url: naming::workspace_url(&self.profile, &uuid),
        })
    }

    async fn provision(
        &self,
        uuid: &str,
        session: &Session,
        provisioned: &mut Vec<Provisioned>,
    ) -> Result<(), ControlPlaneError> {
        self.orchestrator.create_claim(uuid, session, &self.profile).await?;
        provisioned.push(Provisioned::Claim);

        self.orchestrator
            .create_deployment(uuid, session, &self.profile, &self.pod_image, self.pod_port)
            .await?;
        provisioned.push(Provisioned::Deployment);

        self.orchestrator.create_service(uuid, session, self.pod_port).await?;
        provisioned.push(Provisioned::Service);

        self.orchestrator.create_ingress(uuid, session, &self.profile).await?;
        provisioned.push(Provisioned::Ingress);

        if self.profile.use_autoscaler {
            self.orchestrator.create_autoscaler_trigger(uuid, session).await?;
        }

        Ok(())
    }

    /// Best-effort teardown of everything created before the failure, in
    /// reverse order. Errors here are logged, not propagated: the original
    /// error is what the caller sees.
    async fn compensate(&self, uuid: &str, provisioned: &[Provisioned]) {
        warn!(uuid, "session creation failed, compensating");
        for step in provisioned.iter().rev() {
            let outcome = match step {
                Provisioned::Ingress => self.orchestrator.delete_ingress(uuid).await,
                Provisioned::Service => self.orchestrator.delete_service(uuid).await,
                Provisioned::Deployment => self.orchestrator.delete_deployment(uuid).await,
                Provisioned::Claim => self.orchestrator.delete_claim(uuid).await,
            };
            if let Err(err) = outcome {
                warn!(uuid, ?step, error = %err, "compensation step failed");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn wake(&self, uuid: &str) -> Result<Session, ControlPlaneError> {
        self.registry.require(uuid).await?;
        let status = self.orchestrator.get_deployment_status(uuid).await?.ok_or_else(|| {
            ControlPlaneError::OrchestratorError(format!("no deployment for session {uuid}"))
        })?;
        if status.spec_replicas == 0 {
            self.orchestrator.patch_deployment_replicas(uuid, 1).await?;
        }
        let session = self.registry.touch(uuid, Some(SessionStatus::Running)).await?;
        self.registry.record_event(uuid, "session_woken", serde_json::json!({})).await?;
        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn sleep(&self, uuid: &str) -> Result<Session, ControlPlaneError> {
        self.registry.require(uuid).await?;
        self.registry.clear_wake_queue(uuid).await?;
        self.orchestrator.patch_deployment_replicas(uuid, 0).await?;
        let session = self.registry.touch(uuid, Some(SessionStatus::Sleeping)).await?;
        self.registry.record_event(uuid, "session_sleeping", serde_json::json!({})).await?;
        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn scale(&self, uuid: &str, direction: ScaleDirection) -> Result<Session, ControlPlaneError> {
        self.registry.require(uuid).await?;
        let resources = match direction {
            ScaleDirection::Up => self.profile.scale_up_resources,
            ScaleDirection::Down => self.profile.scale_down_resources,
        };
        self.orchestrator.patch_deployment_resources(uuid, resources).await?;
        let session = self.registry.touch(uuid, None).await?;
        let event_type = match direction {
            ScaleDirection::Up => "scaled_up",
            ScaleDirection::Down => "scaled_down",
        };
        self.registry.record_event(uuid, event_type, serde_json::json!({})).await?;
        Ok(session)
    }

    #[instrument(skip(self, message))]
    pub async fn chat(&self, uuid: &str, message: &str) -> Result<ChatOutcome, ControlPlaneError> {
        if message.trim().is_empty() {
            return Err(ControlPlaneError::ValidationError("message must not be empty".to_string()));
        }
        self.registry.require(uuid).await?;

        self.registry.enqueue_wake_signal(uuid).await?;

        if let Some(status) = self.orchestrator.get_deployment_status(uuid).await? {
            if status.spec_replicas == 0 {
                self.orchestrator.patch_deployment_replicas(uuid, 1).await?;
            }
        }

        self.registry.record_chat(uuid, message).await?;
        self.registry.touch(uuid, None).await?;
        self.registry
            .record_event(uuid, "chat_received", serde_json::json!({ "message_length": message.len() }))
            .await?;

        tokio::time::sleep(CHAT_WAKE_GRACE).await;

        let status = self.orchestrator.get_deployment_status(uuid).await?;
        if status.map(|s| s.has_ready_replica()).unwrap_or(false) {
            let address = naming::internal_service_address(uuid, &self.profile.namespace, 80);
            match self.forward_chat(&address, message).await {
                Ok(body) => return Ok(ChatOutcome::Processed(body)),
                Err(err) => warn!(uuid, error = %err, "chat fast path forward failed, falling back to queued"),
            }
        }

        Ok(ChatOutcome::Queued)
    }

    async fn forward_chat(&self, address: &str, message: &str) -> Result<String, ControlPlaneError> {
        let response = self
            .http_client
            .post(format!("{address}/chat"))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .map_err(|e| ControlPlaneError::OrchestratorError(format!("chat forward failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ControlPlaneError::OrchestratorError(format!(
                "pod returned status {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| ControlPlaneError::OrchestratorError(format!("failed to read pod response: {e}")))
    }

    #[instrument(skip(self))]
    pub async fn terminate(&self, uuid: &str) -> Result<(), ControlPlaneError> {
        self.registry.require(uuid).await?;

        self.run_backup(uuid).await;

        self.orchestrator.delete_deployment(uuid).await?;
        self.orchestrator.delete_service(uuid).await?;
        self.orchestrator.delete_ingress(uuid).await?;
        self.orchestrator.delete_claim(uuid).await?;
        if self.profile.use_autoscaler {
            self.orchestrator.delete_autoscaler_trigger(uuid).await?;
        }

        self.registry.destroy(uuid).await?;
        info!(uuid, "session terminated");
        Ok(())
    }

    /// Best-effort, bounded backup. Failure or timeout never blocks
    /// termination; only the outcome is logged.
    async fn run_backup(&self, uuid: &str) {
        let session = match self.registry.require(uuid).await {
            Ok(session) => session,
            Err(_) => return,
        };
        if let Err(err) = self.orchestrator.create_backup_job(uuid, &session).await {
            warn!(uuid, error = %err, "failed to start backup job, proceeding with termination");
            return;
        }

        let job_name = naming::backup_job_name(uuid);
        for _ in 0..BACKUP_POLL_ATTEMPTS {
            match self.orchestrator.get_job_status(&job_name).await {
                Ok(Some(sessionctl_orchestrator::JobStatus::Succeeded)) => {
                    info!(uuid, "backup job succeeded");
                    return;
                }
                Ok(Some(sessionctl_orchestrator::JobStatus::Failed)) => {
                    warn!(uuid, "backup job failed, proceeding with termination");
                    return;
                }
                Ok(_) => tokio::time::sleep(BACKUP_POLL_INTERVAL).await,
                Err(err) => {
                    warn!(uuid, error = %err, "failed to poll backup job status");
                    return;
                }
            }
        }
        warn!(uuid, "backup job timed out, proceeding with termination");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionctl_orchestrator::FakeOrchestratorClient;
    use sessionctl_store::FakeStoreClient;

    fn engine() -> (LifecycleEngine, Arc<FakeOrchestratorClient>) {
        let store = Arc::new(FakeStoreClient::new());
        let registry = Arc::new(SessionRegistry::new(store, 86400));
        let orchestrator = Arc::new(FakeOrchestratorClient::new());
        let profile = Profile::new("user", "preview.example");
        let engine = LifecycleEngine::new(
            registry,
            orchestrator.clone(),
            profile,
            "ghcr.io/sessionctl/user-pod:latest".to_string(),
            8080,
        );
        (engine, orchestrator)
    }

    #[tokio::test]
    async fn create_provisions_objects_and_commits_record() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        assert_eq!(created.status, SessionStatus::Created);
        assert!(orchestrator.has_deployment(&created.uuid));
        assert!(orchestrator.has_claim(&created.uuid));
    }

    #[tokio::test]
    async fn create_rejects_empty_user_id() {
        let (engine, _orchestrator) = engine();
        let err = engine.create("   ").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::ValidationError(_)));
    }

    #[tokio::test]
    async fn wake_patches_replicas_and_marks_running() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        orchestrator.patch_deployment_replicas(&created.uuid, 0).await.unwrap();
        let session = engine.wake(&created.uuid).await.unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        let status = orchestrator.get_deployment_status(&created.uuid).await.unwrap().unwrap();
        assert_eq!(status.spec_replicas, 1);
    }

    #[tokio::test]
    async fn sleep_scales_deployment_to_zero() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        let session = engine.sleep(&created.uuid).await.unwrap();
        assert_eq!(session.status, SessionStatus::Sleeping);
        let status = orchestrator.get_deployment_status(&created.uuid).await.unwrap().unwrap();
        assert_eq!(status.spec_replicas, 0);
    }

    #[tokio::test]
    async fn scale_rewrites_resources() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        engine.scale(&created.uuid, ScaleDirection::Up).await.unwrap();
        let resources = orchestrator.resources_of(&created.uuid).unwrap();
        assert_eq!(resources.requests_cpu, "1000m");
    }

    #[tokio::test]
    async fn chat_falls_back_to_queued_without_ready_replica() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        orchestrator.set_ready_replicas(&created.uuid, 0);
        let outcome = engine.chat(&created.uuid, "hello").await.unwrap();
        assert_eq!(outcome, ChatOutcome::Queued);
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let (engine, _orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        let err = engine.chat(&created.uuid, "").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::ValidationError(_)));
    }

    #[tokio::test]
    async fn terminate_removes_objects_and_session_record() {
        let (engine, orchestrator) = engine();
        let created = engine.create("alice").await.unwrap();
        let job_name = naming::backup_job_name(&created.uuid);
        orchestrator.set_job_status(&job_name, sessionctl_orchestrator::JobStatus::Succeeded);
        engine.terminate(&created.uuid).await.unwrap();
        assert!(!orchestrator.has_deployment(&created.uuid));
        assert!(!orchestrator.has_claim(&created.uuid));
    }

    #[tokio::test]
    async fn terminate_unknown_session_fails() {
        let (engine, _orchestrator) = engine();
        let err = engine.terminate("missing1").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::SessionNotFound(_)));
    }
}
