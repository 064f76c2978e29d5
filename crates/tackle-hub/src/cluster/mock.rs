// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock cluster for testing.
//!
//! Keeps Secrets, Jobs and Addons in memory. Jobs never run on their own; tests
//! drive them to completion with [`MockCluster::mark_job_succeeded`] and
//! [`MockCluster::mark_job_failed`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use rand::Rng;
use tokio::sync::Mutex;

use super::{Addon, AddonSpec, Cluster, ClusterError, Result};

/// Characters Kubernetes uses for generated name suffixes.
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const SUFFIX_LEN: usize = 5;

type Key = (String, String);

#[derive(Default)]
struct MockState {
    addons: BTreeMap<Key, Addon>,
    secrets: BTreeMap<Key, Secret>,
    jobs: BTreeMap<Key, Job>,
    fail_next_secret: Option<String>,
    fail_next_job: Option<String>,
}

/// In-memory cluster.
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<Mutex<MockState>>,
}

impl MockCluster {
    /// Create an empty mock cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an addon image under a name.
    pub async fn register_addon(&self, namespace: &str, name: &str, image: &str) {
        let mut addon = Addon::new(name, AddonSpec::with_image(image));
        addon.metadata.namespace = Some(namespace.to_string());
        self.state
            .lock()
            .await
            .addons
            .insert(key(namespace, name), addon);
    }

    /// Add a `Failed` condition to a job. Returns false if the job does not exist.
    pub async fn mark_job_failed(&self, namespace: &str, name: &str) -> bool {
        self.update_status(namespace, name, |status| {
            status
                .conditions
                .get_or_insert_with(Vec::new)
                .push(JobCondition {
                    type_: "Failed".to_string(),
                    status: "True".to_string(),
                    reason: Some("BackoffLimitExceeded".to_string()),
                    ..Default::default()
                });
            status.failed = Some(1);
        })
        .await
    }

    /// Record one succeeded pod on a job. Returns false if the job does not exist.
    pub async fn mark_job_succeeded(&self, namespace: &str, name: &str) -> bool {
        self.update_status(namespace, name, |status| {
            status.succeeded = Some(1);
            status
                .conditions
                .get_or_insert_with(Vec::new)
                .push(JobCondition {
                    type_: "Complete".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                });
        })
        .await
    }

    /// Drop a job as if it had been garbage collected.
    pub async fn remove_job(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .await
            .jobs
            .remove(&key(namespace, name))
            .is_some()
    }

    /// Make the next `create_secret` call fail with an API error.
    pub async fn fail_next_secret(&self, message: &str) {
        self.state.lock().await.fail_next_secret = Some(message.to_string());
    }

    /// Make the next `create_job` call fail with an API error.
    pub async fn fail_next_job(&self, message: &str) {
        self.state.lock().await.fail_next_job = Some(message.to_string());
    }

    /// Snapshot of all secrets.
    pub async fn secrets(&self) -> Vec<Secret> {
        self.state.lock().await.secrets.values().cloned().collect()
    }

    /// Snapshot of all jobs.
    pub async fn jobs(&self) -> Vec<Job> {
        self.state.lock().await.jobs.values().cloned().collect()
    }

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        update: impl FnOnce(&mut JobStatus),
    ) -> bool {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&key(namespace, name)) {
            Some(job) => {
                update(job.status.get_or_insert_with(JobStatus::default));
                true
            }
            None => false,
        }
    }
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn parse_selector(selector: &str) -> Result<Vec<(&str, &str)>> {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .map(|term| {
            term.split_once('=')
                .ok_or_else(|| ClusterError::Api(format!("unsupported selector '{}'", term)))
        })
        .collect()
}

fn matches_labels(meta: &ObjectMeta, wanted: &[(&str, &str)]) -> bool {
    let labels = meta.labels.as_ref();
    wanted.iter().all(|(k, v)| {
        labels
            .and_then(|labels| labels.get(*k))
            .is_some_and(|value| value == v)
    })
}

/// Resolve `name` / `generateName` into a name unused in `existing`.
fn assign_name<T>(
    meta: &mut ObjectMeta,
    namespace: &str,
    kind: &'static str,
    existing: &BTreeMap<Key, T>,
) -> Result<String> {
    if let Some(name) = &meta.name {
        if existing.contains_key(&key(namespace, name)) {
            return Err(ClusterError::Api(format!(
                "{} '{}' already exists",
                kind, name
            )));
        }
        return Ok(name.clone());
    }

    let prefix = meta
        .generate_name
        .clone()
        .ok_or_else(|| ClusterError::Api(format!("{} has neither name nor generateName", kind)))?;

    let mut rng = rand::rng();
    loop {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        let name = format!("{}{}", prefix, suffix);
        if !existing.contains_key(&key(namespace, &name)) {
            meta.name = Some(name.clone());
            return Ok(name);
        }
    }
}

#[async_trait]
impl Cluster for MockCluster {
    fn cluster_type(&self) -> &'static str {
        "mock"
    }

    async fn get_addon(&self, namespace: &str, name: &str) -> Result<Addon> {
        self.state
            .lock()
            .await
            .addons
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "Addon",
                name: name.to_string(),
            })
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_next_secret.take() {
            return Err(ClusterError::Api(message));
        }

        let mut secret = secret.clone();
        let name = assign_name(&mut secret.metadata, namespace, "Secret", &state.secrets)?;
        secret.metadata.namespace = Some(namespace.to_string());
        state.secrets.insert(key(namespace, &name), secret.clone());
        Ok(secret)
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .secrets
            .remove(&key(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound {
                kind: "Secret",
                name: name.to_string(),
            })
    }

    async fn delete_secrets(&self, namespace: &str, selector: &str) -> Result<()> {
        let wanted = parse_selector(selector)?;
        self.state.lock().await.secrets.retain(|(ns, _), secret| {
            ns != namespace || !matches_labels(&secret.metadata, &wanted)
        });
        Ok(())
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.fail_next_job.take() {
            return Err(ClusterError::Api(message));
        }

        let mut job = job.clone();
        let name = assign_name(&mut job.metadata, namespace, "Job", &state.jobs)?;
        job.metadata.namespace = Some(namespace.to_string());
        job.status = Some(JobStatus {
            active: Some(1),
            ..Default::default()
        });
        state.jobs.insert(key(namespace, &name), job.clone());
        Ok(job)
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        self.state
            .lock()
            .await
            .jobs
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "Job",
                name: name.to_string(),
            })
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        if self.remove_job(namespace, name).await {
            Ok(())
        } else {
            Err(ClusterError::NotFound {
                kind: "Job",
                name: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_prefix(prefix: &str) -> Job {
        Job {
            metadata: ObjectMeta {
                generate_name: Some(prefix.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generate_name() {
        let cluster = MockCluster::new();
        let job = cluster
            .create_job("ns", &job_with_prefix("windup-"))
            .await
            .unwrap();

        let name = job.metadata.name.unwrap();
        assert!(name.starts_with("windup-"));
        assert_eq!(name.len(), "windup-".len() + SUFFIX_LEN);
        assert_eq!(job.metadata.namespace.as_deref(), Some("ns"));
    }

    #[tokio::test]
    async fn test_generated_names_are_distinct() {
        let cluster = MockCluster::new();
        let a = cluster.create_job("ns", &job_with_prefix("t-")).await.unwrap();
        let b = cluster.create_job("ns", &job_with_prefix("t-")).await.unwrap();
        assert_ne!(a.metadata.name, b.metadata.name);
        assert_eq!(cluster.jobs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_job_lifecycle_controls() {
        let cluster = MockCluster::new();
        let job = cluster.create_job("ns", &job_with_prefix("t-")).await.unwrap();
        let name = job.metadata.name.unwrap();

        assert!(cluster.mark_job_failed("ns", &name).await);
        let job = cluster.get_job("ns", &name).await.unwrap();
        let conditions = job.status.unwrap().conditions.unwrap();
        assert_eq!(conditions[0].type_, "Failed");

        assert!(cluster.remove_job("ns", &name).await);
        assert!(cluster.get_job("ns", &name).await.unwrap_err().is_not_found());
        assert!(!cluster.mark_job_succeeded("ns", &name).await);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let cluster = MockCluster::new();
        cluster.fail_next_job("quota exceeded").await;

        let err = cluster
            .create_job("ns", &job_with_prefix("t-"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Api(ref m) if m == "quota exceeded"));
        assert!(cluster.create_job("ns", &job_with_prefix("t-")).await.is_ok());
    }

    fn labeled_secret(task: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                generate_name: Some("task-".to_string()),
                labels: Some(BTreeMap::from([
                    ("task".to_string(), task.to_string()),
                    ("role".to_string(), "addon".to_string()),
                ])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_delete_secrets_by_selector() {
        let cluster = MockCluster::new();
        cluster.create_secret("ns", &labeled_secret("1")).await.unwrap();
        cluster.create_secret("ns", &labeled_secret("1")).await.unwrap();
        let kept = cluster.create_secret("ns", &labeled_secret("2")).await.unwrap();
        cluster.create_secret("other", &labeled_secret("1")).await.unwrap();

        cluster.delete_secrets("ns", "task=1,role=addon").await.unwrap();

        let names: Vec<_> = cluster
            .secrets()
            .await
            .into_iter()
            .map(|s| (s.metadata.namespace.unwrap(), s.metadata.name.unwrap()))
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&("ns".to_string(), kept.metadata.name.unwrap())));
        assert!(names.iter().any(|(ns, _)| ns == "other"));

        cluster.delete_secrets("ns", "task=9").await.unwrap();
        assert_eq!(cluster.secrets().await.len(), 2);
        assert!(cluster.delete_secrets("ns", "task").await.is_err());
    }

    #[tokio::test]
    async fn test_addon_lookup_is_namespaced() {
        let cluster = MockCluster::new();
        cluster
            .register_addon("tackle-hub", "windup", "quay.io/windup:1.0")
            .await;

        let addon = cluster.get_addon("tackle-hub", "windup").await.unwrap();
        assert_eq!(addon.spec.image, "quay.io/windup:1.0");
        assert!(cluster.get_addon("other", "windup").await.unwrap_err().is_not_found());
    }
}
