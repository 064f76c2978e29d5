// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tackle Hub - Addon Task Control Plane
//!
//! An HTTP server responsible for:
//! - Task intake and progress reports
//! - Scheduling tasks as Kubernetes Jobs and reconciling their status
//! - Credential storage, encrypted at rest

use std::sync::Arc;
use tracing::{info, warn};

use tackle_api::Codec;
use tackle_hub::cluster::{Cluster, KubeCluster, MockCluster};
use tackle_hub::config::{ClusterKind, Config};
use tackle_hub::runtime::HubRuntime;
use tackle_hub::scheduler::TaskManagerConfig;
use tackle_hub::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tackle_hub=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        bind_addr = %config.bind_addr,
        namespace = %config.namespace,
        hub_base_url = %config.hub_base_url,
        "Starting Tackle Hub"
    );

    let store = SqliteStore::connect(
        &config.database_url,
        Codec::new(&config.encryption_passphrase),
    )
    .await?;

    info!("Database ready");

    let cluster: Arc<dyn Cluster> = match config.cluster {
        ClusterKind::Kube => Arc::new(KubeCluster::try_default().await?),
        ClusterKind::Mock => {
            warn!("Using in-memory cluster; tasks will never complete");
            Arc::new(MockCluster::new())
        }
    };
    info!(cluster = cluster.cluster_type(), "Cluster gateway initialized");

    let runtime = HubRuntime::builder()
        .store(Arc::new(store))
        .cluster(cluster)
        .bind_addr(config.bind_addr)
        .task_manager(TaskManagerConfig::from(&config))
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.local_addr(), "Hub server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Tackle Hub shut down");

    Ok(())
}
