// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record store for tasks, reports and credentials.
//!
//! The [`Store`] trait is the seam the task manager and the REST layer depend on.
//! [`SqliteStore`] is the shipped backend.
//!
//! Credential-bearing records pass through the [`Codec`](tackle_api::Codec) on every
//! write, so rows never hold sensitive values in plaintext.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use tackle_api::{CodecError, Identity, Proxy, Task, TaskReport, TaskStatus};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind (task, report, identity, proxy).
        kind: &'static str,
        /// Requested ID.
        id: i64,
    },

    /// A unique column already holds the value.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Credential encryption failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A JSON column could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value cannot be mapped back to its wire type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// True for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A task row that could not be mapped to its wire type.
#[derive(Debug)]
pub struct CorruptTask {
    /// ID of the row.
    pub id: i64,
    /// Decoding failure.
    pub error: StoreError,
}

/// One row of a task listing.
pub type TaskEntry = std::result::Result<Task, CorruptTask>;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Generic transactional record store.
#[async_trait]
pub trait Store: Send + Sync {
    // Tasks

    /// Persist a new task with status `""` and an empty job reference.
    async fn create_task(&self, task: &Task) -> Result<Task>;

    /// Load a task. The report is not embedded.
    async fn get_task(&self, id: i64) -> Result<Task>;

    /// All tasks in ID order.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Tasks with the given status in ID order.
    ///
    /// A row that cannot be decoded comes back as a [`CorruptTask`] entry; the
    /// remaining rows are still returned.
    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<TaskEntry>>;

    /// Write the scheduler-owned fields: image, status, error, started, terminated, job.
    async fn update_task_state(&self, task: &Task) -> Result<()>;

    /// Mark a task Failed with `error` without decoding its row.
    async fn fail_task(&self, id: i64, error: &str) -> Result<()>;

    /// Delete a task and its report.
    async fn delete_task(&self, id: i64) -> Result<()>;

    // Reports

    /// The task's report, if the addon created one.
    async fn get_report(&self, task: i64) -> Result<Option<TaskReport>>;

    /// Create the report for `report.task`, replacing any existing one.
    async fn create_report(&self, report: &TaskReport) -> Result<TaskReport>;

    /// Update the report for `report.task`. Fails with NotFound if absent.
    async fn update_report(&self, report: &TaskReport) -> Result<TaskReport>;

    // Identities

    /// Encrypt and persist a new identity.
    async fn create_identity(&self, identity: &Identity) -> Result<Identity>;

    /// Load an identity as stored (encrypted).
    async fn get_identity(&self, id: i64) -> Result<Identity>;

    /// All identities as stored (encrypted).
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Update an identity; plaintext fields merge into the stored blob.
    async fn update_identity(&self, identity: &Identity) -> Result<Identity>;

    /// Delete an identity.
    async fn delete_identity(&self, id: i64) -> Result<()>;

    // Proxies

    /// Encrypt and persist a new proxy.
    async fn create_proxy(&self, proxy: &Proxy) -> Result<Proxy>;

    /// Load a proxy as stored (encrypted).
    async fn get_proxy(&self, id: i64) -> Result<Proxy>;

    /// All proxies as stored (encrypted).
    async fn list_proxies(&self) -> Result<Vec<Proxy>>;

    /// Update a proxy; plaintext fields merge into the stored blob.
    async fn update_proxy(&self, proxy: &Proxy) -> Result<Proxy>;

    /// Delete a proxy.
    async fn delete_proxy(&self, id: i64) -> Result<()>;
}
