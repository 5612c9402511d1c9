//! Pure object-spec construction for everything a session owns.
//!
//! No I/O here: each function turns a session UUID, a [`Profile`], and a few
//! scalars into the typed object the orchestrator client then creates.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PodSpec, PodTemplateSpec, ResourceRequirements, Secret, Service, ServicePort, ServiceSpec,
    Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend,
    IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use chrono::Datelike;
use sessionctl_core::profile::Profile;
use sessionctl_core::types::ResourceSpec;
use sessionctl_core::{naming, Session};
use std::collections::BTreeMap;

fn object_meta(name: String, uuid: &str, user_id: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        labels: Some(naming::labels(uuid, user_id).into_iter().collect()),
        ..Default::default()
    }
}

fn resource_requirements(spec: ResourceSpec) -> ResourceRequirements {
    let mut requests = BTreeMap::new();
    requests.insert("memory".to_string(), Quantity(spec.requests_memory.to_string()));
    requests.insert("cpu".to_string(), Quantity(spec.requests_cpu.to_string()));
    let mut limits = BTreeMap::new();
    limits.insert("memory".to_string(), Quantity(spec.limits_memory.to_string()));
    limits.insert("cpu".to_string(), Quantity(spec.limits_cpu.to_string()));
    ResourceRequirements {
        requests: Some(requests),
        limits: Some(limits),
        ..Default::default()
    }
}

/// `pvc-{U}`, ReadWriteOnce, sized per the profile.
pub fn build_claim(uuid: &str, session: &Session, profile: &Profile) -> PersistentVolumeClaim {
    let mut storage = BTreeMap::new();
    storage.insert("storage".to_string(), Quantity(format!("{}Gi", profile.claim_size_gib)));

    PersistentVolumeClaim {
        metadata: object_meta(naming::claim_name(uuid), uuid, &session.user_id),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(storage),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `user-{U}` deployment with one container mounting the claim's sub-paths.
pub fn build_deployment(
    uuid: &str,
    session: &Session,
    profile: &Profile,
    pod_image: &str,
    pod_port: u16,
    resources: ResourceSpec,
) -> Deployment {
    let claim_name = naming::claim_name(uuid);
    let volumes = vec![Volume {
        name: "data".to_string(),
        persistent_volume_claim: Some(
            k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.clone(),
                read_only: Some(false),
            },
        ),
        ..Default::default()
    }];

    let volume_mounts: Vec<VolumeMount> = profile
        .mounts
        .iter()
        .map(|m| VolumeMount {
            name: "data".to_string(),
            mount_path: m.container_path.to_string(),
            sub_path: Some(m.sub_path.to_string()),
            ..Default::default()
        })
        .collect();

    let container = Container {
        name: "user-pod".to_string(),
        image: Some(pod_image.to_string()),
        ports: Some(vec![ContainerPort { container_port: pod_port as i32, ..Default::default() }]),
        env: Some(vec![
            EnvVar {
                name: "SESSION_UUID".to_string(),
                value: Some(uuid.to_string()),
                ..Default::default()
            },
            EnvVar {
                name: "USER_ID".to_string(),
                value: Some(session.user_id.clone()),
                ..Default::default()
            },
        ]),
        resources: Some(resource_requirements(resources)),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    let labels: BTreeMap<String, String> = [("app".to_string(), naming::deployment_name(uuid))]
        .into_iter()
        .chain(naming::labels(uuid, &session.user_id))
        .collect();

    Deployment {
        metadata: object_meta(naming::deployment_name(uuid), uuid, &session.user_id),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(
                    [("app".to_string(), naming::deployment_name(uuid))].into_iter().collect(),
                ),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta { labels: Some(labels), ..Default::default() }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `user-{U}` ClusterIP service forwarding port 80 to the pod's port.
pub fn build_service(uuid: &str, session: &Session, pod_port: u16) -> Service {
    Service {
        metadata: object_meta(naming::service_name(uuid), uuid, &session.user_id),
        spec: Some(ServiceSpec {
            selector: Some([("app".to_string(), naming::deployment_name(uuid))].into_iter().collect()),
            ports: Some(vec![ServicePort {
                port: 80,
                target_port: Some(IntOrString::Int(pod_port as i32)),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `user-{U}` ingress routing `<prefix>-{U}.<domain>` to the internal service.
pub fn build_ingress(uuid: &str, session: &Session, profile: &Profile) -> Ingress {
    let host = naming::external_host(profile, uuid);
    let mut annotations = BTreeMap::new();
    annotations.insert(
        "cert-manager.io/cluster-issuer".to_string(),
        "letsencrypt".to_string(),
    );

    Ingress {
        metadata: ObjectMeta {
            name: Some(naming::ingress_name(uuid)),
            labels: Some(naming::labels(uuid, &session.user_id).into_iter().collect()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some("nginx".to_string()),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(naming::tls_secret_name(uuid)),
            }]),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: naming::service_name(uuid),
                                port: Some(ServiceBackendPort { number: Some(80), ..Default::default() }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `trigger-{U}` secret: the credential an external autoscaler reads to
/// discover and scale this session's deployment. Owned and torn down the
/// same way as the deployment itself, per the profile's `use_autoscaler`.
pub fn build_autoscaler_trigger(uuid: &str, session: &Session) -> Secret {
    let mut string_data = BTreeMap::new();
    string_data.insert("session-uuid".to_string(), uuid.to_string());
    string_data.insert("target-deployment".to_string(), naming::deployment_name(uuid));

    Secret {
        metadata: object_meta(naming::autoscaler_trigger_name(uuid), uuid, &session.user_id),
        string_data: Some(string_data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// `backup-{U}` batch job: mounts the session's claim read-only at `/app`
/// and a shared backup claim read-write at `/backup`, then zips the former
/// into a date-partitioned path under the latter.
pub fn build_backup_job(
    uuid: &str,
    session: &Session,
    backup_claim_name: &str,
    backup_image: &str,
) -> Job {
    let claim_name = naming::claim_name(uuid);
    let now = chrono::Utc::now();
    let dest_dir = format!("/backup/{}/{:02}/{:02}", now.format("%Y"), now.month(), now.day());
    let dest_file = format!(
        "{dest_dir}/app-{uuid}-{}.zip",
        now.format("%Y%m%d-%H%M%S")
    );
    let script = format!("mkdir -p {dest_dir} && zip -r {dest_file} /app");

    let volumes = vec![
        Volume {
            name: "source".to_string(),
            persistent_volume_claim: Some(
                k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource {
                    claim_name,
                    read_only: Some(true),
                },
            ),
            ..Default::default()
        },
        Volume {
            name: "backup".to_string(),
            persistent_volume_claim: Some(
                k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource {
                    claim_name: backup_claim_name.to_string(),
                    read_only: Some(false),
                },
            ),
            ..Default::default()
        },
    ];

    let container = Container {
        name: "backup".to_string(),
        image: Some(backup_image.to_string()),
        command: Some(vec!["sh".to_string(), "-c".to_string(), script]),
        volume_mounts: Some(vec![
            VolumeMount { name: "source".to_string(), mount_path: "/app".to_string(), read_only: Some(true), ..Default::default() },
            VolumeMount { name: "backup".to_string(), mount_path: "/backup".to_string(), ..Default::default() },
        ]),
        ..Default::default()
    };

    Job {
        metadata: object_meta(naming::backup_job_name(uuid), uuid, &session.user_id),
        spec: Some(JobSpec {
            // auto-deleted 300s after completion
            ttl_seconds_after_finished: Some(300),
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    restart_policy: Some("Never".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
