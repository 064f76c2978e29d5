// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret and Job templates for an addon task.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, PersistentVolumeClaimVolumeSource, PodAffinity, PodAffinityTerm,
    PodSpec, PodTemplateSpec, Secret, SecretVolumeSource, Volume, VolumeMount,
    WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use tackle_api::secret::env;
use tackle_api::{AddonSecret, SECRET_FILE, Task};

use super::TaskManagerConfig;
use crate::cluster::Addon;

/// Mount path of the task Secret.
pub const SECRET_MOUNT: &str = "/tmp/secret";
/// Mount path of the shared bucket volume.
pub const BUCKET_MOUNT: &str = "/tmp/bucket";
/// Name of the single addon container.
pub const CONTAINER_NAME: &str = "addon";

/// Label carrying the task ID.
pub const LABEL_TASK: &str = "task";
/// Label shared by every addon pod, used for affinity.
pub const LABEL_ROLE: &str = "role";
/// Value of [`LABEL_ROLE`] on addon pods.
pub const ROLE_ADDON: &str = "addon";

const VOLUME_SECRET: &str = "secret";
const VOLUME_BUCKET: &str = "bucket";
const TOPOLOGY_HOSTNAME: &str = "kubernetes.io/hostname";
const AFFINITY_WEIGHT: i32 = 100;

/// Longest prefix that still leaves room for the 5-char suffix in a 63-char name.
const MAX_PREFIX: usize = 57;

/// `generateName` prefix for a task's objects: the task name as a DNS label plus `-`.
pub fn generate_name(task: &Task) -> String {
    let mut prefix: String = task
        .name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    prefix.truncate(MAX_PREFIX - 1);
    let prefix = prefix.trim_matches('-');
    if prefix.is_empty() {
        "task-".to_string()
    } else {
        format!("{}-", prefix)
    }
}

/// Label selector matching the objects created for task `id`.
pub fn task_selector(id: i64) -> String {
    format!("{}={},{}={}", LABEL_TASK, id, LABEL_ROLE, ROLE_ADDON)
}

fn labels(task: &Task) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_TASK.to_string(), task.id.to_string()),
        (LABEL_ROLE.to_string(), ROLE_ADDON.to_string()),
    ])
}

/// Secret holding the task context as `secret.json`.
pub fn secret(task: &Task, payload: &AddonSecret) -> Result<Secret, serde_json::Error> {
    let content = serde_json::to_vec(payload)?;
    Ok(Secret {
        metadata: ObjectMeta {
            generate_name: Some(generate_name(task)),
            labels: Some(labels(task)),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            SECRET_FILE.to_string(),
            ByteString(content),
        )])),
        ..Default::default()
    })
}

/// Job running the addon image against the given Secret.
pub fn job(task: &Task, addon: &Addon, secret_name: &str, config: &TaskManagerConfig) -> Job {
    let labels = labels(task);

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(addon.spec.image.clone()),
        image_pull_policy: addon.spec.image_pull_policy.clone(),
        resources: addon.spec.resource_requirements(),
        env: Some(vec![
            env_var(env::HUB_BASE_URL, &config.hub_base_url),
            env_var(
                env::ADDON_SECRET_PATH,
                &format!("{}/{}", SECRET_MOUNT, SECRET_FILE),
            ),
            env_var(env::ADDON_BUCKET_PATH, BUCKET_MOUNT),
        ]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: VOLUME_SECRET.to_string(),
                mount_path: SECRET_MOUNT.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: VOLUME_BUCKET.to_string(),
                mount_path: BUCKET_MOUNT.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    };

    let volumes = vec![
        Volume {
            name: VOLUME_SECRET.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret_name.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: VOLUME_BUCKET.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: config.bucket_claim.clone(),
                read_only: Some(false),
            }),
            ..Default::default()
        },
    ];

    Job {
        metadata: ObjectMeta {
            generate_name: Some(generate_name(task)),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![container],
                    volumes: Some(volumes),
                    affinity: Some(affinity()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

/// Prefer nodes already running addon pods; the bucket PVC is usually RWO.
fn affinity() -> Affinity {
    Affinity {
        pod_affinity: Some(PodAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                WeightedPodAffinityTerm {
                    weight: AFFINITY_WEIGHT,
                    pod_affinity_term: PodAffinityTerm {
                        label_selector: Some(LabelSelector {
                            match_labels: Some(BTreeMap::from([(
                                LABEL_ROLE.to_string(),
                                ROLE_ADDON.to_string(),
                            )])),
                            ..Default::default()
                        }),
                        topology_key: TOPOLOGY_HOSTNAME.to_string(),
                        ..Default::default()
                    },
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
