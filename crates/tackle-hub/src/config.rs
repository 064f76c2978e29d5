// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for tackle-hub.

use std::net::SocketAddr;
use std::time::Duration;

/// Which cluster gateway the hub drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    /// Real Kubernetes API from the ambient kubeconfig / service account.
    Kube,
    /// In-memory cluster; jobs never run. For local development.
    Mock,
}

/// Hub configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL.
    pub database_url: String,
    /// HTTP bind address for the REST API.
    pub bind_addr: SocketAddr,
    /// Namespace addon jobs and secrets are created in.
    pub namespace: String,
    /// Base URL addons use to reach the hub.
    pub hub_base_url: String,
    /// Name of the PVC mounted as the shared bucket volume.
    pub bucket_claim: String,
    /// Passphrase for credential encryption at rest.
    pub encryption_passphrase: String,
    /// Bearer token handed to addons, if auth is enabled upstream.
    pub addon_token: Option<String>,
    /// Task manager tick interval.
    pub tick_interval: Duration,
    /// Cluster gateway backend.
    pub cluster: ClusterKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("TACKLE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:.data/hub.db?mode=rwc".to_string());

        let port: u16 = std::env::var("TACKLE_HUB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let namespace =
            std::env::var("TACKLE_NAMESPACE").unwrap_or_else(|_| "konveyor-tackle".to_string());

        let hub_base_url = std::env::var(tackle_api::secret::env::HUB_BASE_URL)
            .unwrap_or_else(|_| format!("http://tackle-hub.{}.svc:{}", namespace, port));

        let bucket_claim =
            std::env::var("TACKLE_BUCKET_PVC").unwrap_or_else(|_| "tackle-hub-bucket".to_string());

        let encryption_passphrase =
            std::env::var("TACKLE_ENCRYPTION_PASSPHRASE").unwrap_or_else(|_| "tackle".to_string());

        let addon_token = std::env::var("TACKLE_ADDON_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let tick_ms: u64 = match std::env::var("TACKLE_TASK_TICK_MS") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "TACKLE_TASK_TICK_MS",
                value: v,
            })?,
            Err(_) => 1_000,
        };

        let cluster = match std::env::var("TACKLE_CLUSTER").as_deref() {
            Ok("mock") => ClusterKind::Mock,
            Ok("kube") | Err(_) => ClusterKind::Kube,
            Ok(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "TACKLE_CLUSTER",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            database_url,
            bind_addr,
            namespace,
            hub_base_url,
            bucket_claim,
            encryption_passphrase,
            addon_token,
            tick_interval: Duration::from_millis(tick_ms),
            cluster,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// A variable holds a value that cannot be used.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}
