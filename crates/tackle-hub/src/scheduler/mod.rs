// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task manager.
//!
//! Drives every task from pending to a terminal state by reconciling it against
//! a Kubernetes Job. Each tick:
//!
//! 1. Schedules every pending task (status `""`): resolve the addon, create the
//!    Secret and the Job, mark the task Running.
//! 2. Reconciles every Running task against its Job: a Failed condition fails
//!    the task, a succeeded pod completes it, a missing Job is recreated.
//!
//! Errors are confined to the task they occurred on; the tick moves on to the next.

pub mod job;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::batch::v1::Job;
use tackle_api::{AddonSecret, Task, TaskStatus};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::cluster::Cluster;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{CorruptTask, Store, TaskEntry};

/// Error recorded on a task whose Job reported a Failed condition.
pub const JOB_FAILED: &str = "job failed.";

/// Task manager configuration.
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Pause between ticks.
    pub tick_interval: Duration,
    /// Namespace jobs, secrets and addons live in.
    pub namespace: String,
    /// Hub URL handed to addon pods.
    pub hub_base_url: String,
    /// PVC mounted as the shared bucket volume.
    pub bucket_claim: String,
    /// Credential passphrase injected into the task Secret.
    pub passphrase: Option<String>,
    /// Hub bearer token injected into the task Secret.
    pub token: Option<String>,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            namespace: "konveyor-tackle".to_string(),
            hub_base_url: "http://tackle-hub:8080".to_string(),
            bucket_claim: "tackle-hub-bucket".to_string(),
            passphrase: None,
            token: None,
        }
    }
}

impl From<&Config> for TaskManagerConfig {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.tick_interval,
            namespace: config.namespace.clone(),
            hub_base_url: config.hub_base_url.clone(),
            bucket_claim: config.bucket_claim.clone(),
            passphrase: Some(config.encryption_passphrase.clone()),
            token: config.addon_token.clone(),
        }
    }
}

/// Background worker that schedules and reconciles tasks.
pub struct TaskManager {
    store: Arc<dyn Store>,
    cluster: Arc<dyn Cluster>,
    config: TaskManagerConfig,
    shutdown: Arc<Notify>,
}

impl TaskManager {
    /// Create a new task manager.
    pub fn new(store: Arc<dyn Store>, cluster: Arc<dyn Cluster>, config: TaskManagerConfig) -> Self {
        Self {
            store,
            cluster,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the task manager loop until shutdown is signalled.
    pub async fn run(&self) {
        info!(
            tick_ms = self.config.tick_interval.as_millis() as u64,
            namespace = %self.config.namespace,
            cluster = self.cluster.cluster_type(),
            "Task manager started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Task manager received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.tick_interval) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Task manager tick failed");
                    }
                }
            }
        }

        info!("Task manager stopped");
    }

    /// One pass: schedule pending tasks, then reconcile running ones.
    ///
    /// Returns an error only when the task lists cannot be loaded.
    pub async fn tick(&self) -> Result<()> {
        let pending = self.store.list_tasks_by_status(TaskStatus::Created).await?;
        for entry in pending {
            let Some(mut task) = self.readable(entry).await else {
                continue;
            };
            if let Err(e) = self.schedule(&mut task).await {
                error!(task = task.id, error = %e, "Failed to schedule task");
            }
        }

        let running = self.store.list_tasks_by_status(TaskStatus::Running).await?;
        for entry in running {
            let Some(mut task) = self.readable(entry).await else {
                continue;
            };
            if let Err(e) = self.reconcile(&mut task).await {
                error!(task = task.id, error = %e, "Failed to reconcile task");
            }
        }

        Ok(())
    }

    /// Unwrap a listed task, failing rows that cannot be decoded.
    async fn readable(&self, entry: TaskEntry) -> Option<Task> {
        match entry {
            Ok(task) => Some(task),
            Err(CorruptTask { id, error: e }) => {
                error!(task = id, error = %e, "Unreadable task record");
                let message = format!("unreadable task record: {}", e);
                if let Err(e) = self.store.fail_task(id, &message).await {
                    error!(task = id, error = %e, "Failed to mark unreadable task Failed");
                }
                None
            }
        }
    }

    /// Create the task's Secret and Job and mark it Running, or Failed if any step fails.
    async fn schedule(&self, task: &mut Task) -> Result<()> {
        match self.run_task(task).await {
            Ok(job) => {
                info!(task = task.id, job = %job, image = %task.image, "Task running");
                task.status = TaskStatus::Running;
                task.started = Some(Utc::now());
                task.terminated = None;
                task.error.clear();
                task.job = job;
            }
            Err(e) => {
                warn!(task = task.id, addon = %task.addon, error = %e, "Task failed to start");
                task.status = TaskStatus::Failed;
                task.error = e.to_string();
                task.terminated = Some(Utc::now());
            }
        }

        self.store.update_task_state(task).await?;
        Ok(())
    }

    /// Resolve the addon and create the Secret/Job pair. Returns the `namespace/name` job reference.
    async fn run_task(&self, task: &mut Task) -> Result<String> {
        let namespace = self.config.namespace.as_str();

        let addon = self
            .cluster
            .get_addon(namespace, &task.addon)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::AddonNotFound(task.addon.clone())
                } else {
                    e.into()
                }
            })?;
        task.image = addon.spec.image.clone();

        let secret = self
            .cluster
            .create_secret(namespace, &job::secret(task, &self.secret_payload(task))?)
            .await?;
        let secret_name = secret
            .metadata
            .name
            .ok_or_else(|| Error::Other("Secret created without a name".to_string()))?;
        debug!(task = task.id, secret = %secret_name, "Secret created");

        let created = match self
            .cluster
            .create_job(namespace, &job::job(task, &addon, &secret_name, &self.config))
            .await
        {
            Ok(created) => created,
            Err(e) => {
                // Single best-effort delete, no retry.
                if let Err(cleanup) = self.cluster.delete_secret(namespace, &secret_name).await {
                    warn!(
                        task = task.id,
                        secret = %secret_name,
                        error = %cleanup,
                        "Failed to delete Secret after Job creation failed"
                    );
                }
                return Err(e.into());
            }
        };

        let job_name = created
            .metadata
            .name
            .ok_or_else(|| Error::Other("Job created without a name".to_string()))?;

        Ok(format!("{}/{}", namespace, job_name))
    }

    /// Delete Secrets left behind by earlier runs of `task`.
    async fn release_secrets(&self, task: &Task, namespace: &str) {
        if let Err(e) = self
            .cluster
            .delete_secrets(namespace, &job::task_selector(task.id))
            .await
        {
            warn!(task = task.id, error = %e, "Failed to delete stale Secrets");
        }
    }

    fn secret_payload(&self, task: &Task) -> AddonSecret {
        let mut payload = AddonSecret::new(task.id, task.data.clone());
        if let Some(token) = &self.config.token {
            payload = payload.with_token(token.clone());
        }
        if let Some(passphrase) = &self.config.passphrase {
            payload = payload.with_passphrase(passphrase.clone());
        }
        payload
    }

    /// Reflect the Job's observed status onto a Running task.
    async fn reconcile(&self, task: &mut Task) -> Result<()> {
        let (namespace, name) = match parse_job_reference(&task.job) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(task = task.id, error = %e, "Running task has no usable Job; rescheduling");
                self.release_secrets(task, &self.config.namespace).await;
                return self.schedule(task).await;
            }
        };

        let job = match self.cluster.get_job(namespace, name).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                info!(task = task.id, job = %task.job, "Job not found; rescheduling");
                self.release_secrets(task, namespace).await;
                return self.schedule(task).await;
            }
            Err(e) => {
                warn!(task = task.id, job = %task.job, error = %e, "Failed to read Job");
                task.status = TaskStatus::Failed;
                task.error = e.to_string();
                task.terminated = Some(Utc::now());
                self.store.update_task_state(task).await?;
                return Ok(());
            }
        };

        match job_outcome(&job) {
            Some(TaskStatus::Failed) => {
                info!(task = task.id, job = %task.job, "Task failed");
                task.status = TaskStatus::Failed;
                task.error = JOB_FAILED.to_string();
                task.terminated = Some(Utc::now());
                self.store.update_task_state(task).await?;
            }
            Some(TaskStatus::Succeeded) => {
                info!(task = task.id, job = %task.job, "Task succeeded");
                task.status = TaskStatus::Succeeded;
                task.terminated = Some(Utc::now());
                self.store.update_task_state(task).await?;
            }
            _ => {
                debug!(task = task.id, job = %task.job, "Task still running");
            }
        }

        Ok(())
    }
}

/// Terminal status implied by a Job, if any. A Failed condition wins over succeeded pods.
pub fn job_outcome(job: &Job) -> Option<TaskStatus> {
    let status = job.status.as_ref()?;

    let failed = status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Failed");
    if failed {
        return Some(TaskStatus::Failed);
    }

    if status.succeeded.unwrap_or(0) > 0 {
        return Some(TaskStatus::Succeeded);
    }

    None
}

/// Split a `namespace/name` job reference.
pub fn parse_job_reference(reference: &str) -> Result<(&str, &str)> {
    match reference.split_once('/') {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace, name))
        }
        _ => Err(Error::InvalidJobReference(reference.to_string())),
    }
}
