// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kubernetes API server gateway.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use tracing::debug;

use super::{Addon, Cluster, ClusterError, Result};

/// Gateway backed by a `kube` client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster service account or the local kubeconfig.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn addons(&self, namespace: &str) -> Api<Addon> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a `kube` error, turning 404 into [`ClusterError::NotFound`].
fn map_error(kind: &'static str, name: &str, e: kube::Error) -> ClusterError {
    match e {
        kube::Error::Api(response) if response.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => ClusterError::Api(other.to_string()),
    }
}

/// Name to report in errors for an object that may only carry `generateName`.
fn display_name(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name
        .clone()
        .or_else(|| meta.generate_name.clone())
        .unwrap_or_default()
}

#[async_trait]
impl Cluster for KubeCluster {
    fn cluster_type(&self) -> &'static str {
        "kube"
    }

    async fn get_addon(&self, namespace: &str, name: &str) -> Result<Addon> {
        self.addons(namespace)
            .get(name)
            .await
            .map_err(|e| map_error("Addon", name, e))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let created = self
            .secrets(namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| map_error("Secret", &display_name(&secret.metadata), e))?;
        debug!(namespace, secret = ?created.metadata.name, "Secret created");
        Ok(created)
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        self.secrets(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_error("Secret", name, e))?;
        debug!(namespace, secret = name, "Secret deleted");
        Ok(())
    }

    async fn delete_secrets(&self, namespace: &str, selector: &str) -> Result<()> {
        self.secrets(namespace)
            .delete_collection(&DeleteParams::default(), &ListParams::default().labels(selector))
            .await
            .map_err(|e| map_error("Secret", selector, e))?;
        debug!(namespace, selector, "Secrets deleted");
        Ok(())
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job> {
        let created = self
            .jobs(namespace)
            .create(&PostParams::default(), job)
            .await
            .map_err(|e| map_error("Job", &display_name(&job.metadata), e))?;
        debug!(namespace, job = ?created.metadata.name, "Job created");
        Ok(created)
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        self.jobs(namespace)
            .get(name)
            .await
            .map_err(|e| map_error("Job", name, e))
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        // Background propagation so the Job's pods go with it.
        self.jobs(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map_err(|e| map_error("Job", name, e))?;
        debug!(namespace, job = name, "Job deleted");
        Ok(())
    }
}
