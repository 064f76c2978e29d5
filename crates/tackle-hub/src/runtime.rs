// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for tackle-hub.
//!
//! [`HubRuntime`] runs the task manager and the REST server inside an existing
//! tokio application.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tackle_api::Codec;
//! use tackle_hub::cluster::KubeCluster;
//! use tackle_hub::runtime::HubRuntime;
//! use tackle_hub::store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::connect("sqlite:.data/hub.db", Codec::new("secret")).await?;
//!     let cluster = KubeCluster::try_default().await?;
//!
//!     let runtime = HubRuntime::builder()
//!         .store(Arc::new(store))
//!         .cluster(Arc::new(cluster))
//!         .bind_addr("0.0.0.0:8080".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{AppState, router};
use crate::cluster::Cluster;
use crate::scheduler::{TaskManager, TaskManagerConfig};
use crate::store::Store;

/// Builder for creating a [`HubRuntime`].
pub struct HubRuntimeBuilder {
    store: Option<Arc<dyn Store>>,
    cluster: Option<Arc<dyn Cluster>>,
    bind_addr: SocketAddr,
    task_manager: TaskManagerConfig,
}

impl Default for HubRuntimeBuilder {
    fn default() -> Self {
        Self {
            store: None,
            cluster: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            task_manager: TaskManagerConfig::default(),
        }
    }
}

impl HubRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record store (required).
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the cluster gateway (required).
    pub fn cluster(mut self, cluster: Arc<dyn Cluster>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Set the bind address for the REST server.
    ///
    /// Default: `0.0.0.0:8080`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the task manager configuration.
    pub fn task_manager(mut self, config: TaskManagerConfig) -> Self {
        self.task_manager = config;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<HubRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;
        let cluster = self
            .cluster
            .ok_or_else(|| anyhow::anyhow!("cluster is required"))?;

        Ok(HubRuntimeConfig {
            store,
            cluster,
            bind_addr: self.bind_addr,
            task_manager: self.task_manager,
        })
    }
}

/// Configuration for a [`HubRuntime`].
pub struct HubRuntimeConfig {
    store: Arc<dyn Store>,
    cluster: Arc<dyn Cluster>,
    bind_addr: SocketAddr,
    task_manager: TaskManagerConfig,
}

impl HubRuntimeConfig {
    /// Bind the REST server and spawn it together with the task manager.
    pub async fn start(self) -> Result<HubRuntime> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let manager = TaskManager::new(
            self.store.clone(),
            self.cluster.clone(),
            self.task_manager,
        );
        let manager_shutdown = manager.shutdown_handle();
        let manager_handle = tokio::spawn(async move {
            manager.run().await;
        });

        let app = router(AppState::new(self.store, self.cluster));
        let (server_shutdown_tx, mut server_shutdown_rx) = watch::channel(false);
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await?;
            Ok::<(), anyhow::Error>(())
        });

        info!(addr = %local_addr, "HubRuntime started");

        Ok(HubRuntime {
            server_handle,
            manager_handle,
            server_shutdown_tx,
            manager_shutdown,
            local_addr,
        })
    }
}

/// A running hub: REST server plus task manager.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct HubRuntime {
    server_handle: JoinHandle<Result<()>>,
    manager_handle: JoinHandle<()>,
    server_shutdown_tx: watch::Sender<bool>,
    manager_shutdown: Arc<Notify>,
    local_addr: SocketAddr,
}

impl HubRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> HubRuntimeBuilder {
        HubRuntimeBuilder::new()
    }

    /// Address the REST server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished() && !self.manager_handle.is_finished()
    }

    /// Gracefully shut down the server and the task manager.
    pub async fn shutdown(self) -> Result<()> {
        info!("HubRuntime shutting down...");

        let _ = self.server_shutdown_tx.send(true);
        self.manager_shutdown.notify_one();

        if let Err(e) = self.manager_handle.await {
            error!("Task manager panicked: {}", e);
        }

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("HubRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("HubRuntime server error during shutdown: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("HubRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }
}
