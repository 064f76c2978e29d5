// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster gateway.
//!
//! Abstracts the handful of Kubernetes calls the hub needs: Secrets and Jobs for
//! running addons, and the Addon directory for resolving images.
//!
//! - [`KubeCluster`]: the real API server.
//! - [`MockCluster`]: in-memory, for tests and local runs.

mod addon;
mod kubernetes;
mod mock;

pub use addon::{Addon, AddonSpec};
pub use kubernetes::KubeCluster;
pub use mock::MockCluster;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

/// Errors from cluster operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusterError {
    /// The object does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind.
        kind: &'static str,
        /// Object name.
        name: String,
    },

    /// Any other API failure.
    #[error("Cluster API error: {0}")]
    Api(String),
}

impl ClusterError {
    /// True for [`ClusterError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

/// Result type for cluster operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Namespace-scoped operations against the cluster.
///
/// Created objects may carry `metadata.generateName` instead of a name; the
/// returned object holds the name the cluster assigned.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Gateway identifier (e.g., "kube", "mock").
    fn cluster_type(&self) -> &'static str;

    /// Resolve an addon by name.
    async fn get_addon(&self, namespace: &str, name: &str) -> Result<Addon>;

    /// Create a Secret.
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret>;

    /// Delete a Secret.
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;

    /// Delete every Secret matching a label selector of `key=value` pairs
    /// joined by commas. Matching nothing is not an error.
    async fn delete_secrets(&self, namespace: &str, selector: &str) -> Result<()>;

    /// Create a Job.
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job>;

    /// Fetch a Job with its current status.
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job>;

    /// Delete a Job and its pods.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;
}
