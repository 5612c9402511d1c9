//! Deployment profile: the knobs that differ between the historical
//! `session-manager` / `client-session-manager` variants this control plane
//! unifies. Selected once at startup from configuration and threaded through
//! naming, the orchestrator client, and the lifecycle engine.

use crate::types::ResourceSpec;

/// One mount carved out of the session's single persistent volume claim.
#[derive(Debug, Clone, Copy)]
pub struct MountSpec {
    pub container_path: &'static str,
    pub sub_path: &'static str,
}

pub const DEFAULT_MOUNTS: &[MountSpec] = &[
    MountSpec { container_path: "/app", sub_path: "app" },
    MountSpec { container_path: "/root", sub_path: "root" },
    MountSpec { container_path: "/etc/supervisor", sub_path: "etc/supervisor" },
    MountSpec { container_path: "/var/log", sub_path: "var/log" },
    MountSpec { container_path: "/data/db", sub_path: "data/db" },
];

pub const BASE_RESOURCES: ResourceSpec = ResourceSpec {
    requests_memory: "256Mi",
    requests_cpu: "250m",
    limits_memory: "512Mi",
    limits_cpu: "500m",
};

pub const SCALE_UP_RESOURCES: ResourceSpec = ResourceSpec {
    requests_memory: "1Gi",
    requests_cpu: "1000m",
    limits_memory: "2Gi",
    limits_cpu: "2000m",
};

pub const SCALE_DOWN_RESOURCES: ResourceSpec = ResourceSpec {
    requests_memory: "512Mi",
    requests_cpu: "500m",
    limits_memory: "1Gi",
    limits_cpu: "1000m",
};

/// Everything that varied across the historical session-manager forks.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Object/host name prefix: `user`, `client`, `vs-code`, ...
    pub prefix: String,
    /// Base domain external hosts are carved from.
    pub base_domain: String,
    /// Sub-paths mounted from the session's single claim.
    pub mounts: Vec<MountSpec>,
    pub base_resources: ResourceSpec,
    pub scale_up_resources: ResourceSpec,
    pub scale_down_resources: ResourceSpec,
    /// Whether this profile provisions an autoscaler trigger credential
    /// alongside the deployment (open question 2: per-profile, not global).
    pub use_autoscaler: bool,
    pub claim_size_gib: u32,
    /// Orchestrator namespace objects are created in.
    pub namespace: String,
}

impl Profile {
    pub fn new(prefix: impl Into<String>, base_domain: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base_domain: base_domain.into(),
            mounts: DEFAULT_MOUNTS.to_vec(),
            base_resources: BASE_RESOURCES,
            scale_up_resources: SCALE_UP_RESOURCES,
            scale_down_resources: SCALE_DOWN_RESOURCES,
            use_autoscaler: false,
            claim_size_gib: 10,
            namespace: "default".to_string(),
        }
    }

    pub fn with_autoscaler(mut self, enabled: bool) -> Self {
        self.use_autoscaler = enabled;
        self
    }

    pub fn with_claim_size_gib(mut self, gib: u32) -> Self {
        self.claim_size_gib = gib;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
