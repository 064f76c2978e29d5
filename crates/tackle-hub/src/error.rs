// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tackle-hub.

use thiserror::Error;

/// Hub errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Record store operation failed.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Cluster API call failed.
    #[error(transparent)]
    Cluster(#[from] crate::cluster::ClusterError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The task names an addon the directory does not know.
    #[error("Addon '{0}' not found")]
    AddonNotFound(String),

    /// A task's job reference is not `namespace/name`.
    #[error("Invalid job reference: '{0}'")]
    InvalidJobReference(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type using hub Error.
pub type Result<T> = std::result::Result<T, Error>;
