// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed record store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tackle_api::{Codec, Identity, Proxy, Task, TaskReport, TaskStatus};
use tracing::debug;

use super::{CorruptTask, Result, Store, StoreError, TaskEntry};
use crate::model::{IdentityRow, ProxyRow, TaskReportRow, TaskRow};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

const TASK_COLUMNS: &str =
    "id, name, addon, image, data, status, error, started, terminated, job, created";

const REPORT_COLUMNS: &str =
    "id, task, status, error, total, completed, activity, created, updated";

const IDENTITY_COLUMNS: &str =
    "id, kind, name, description, user, password, key, settings, encrypted";

const PROXY_COLUMNS: &str = "id, enabled, kind, host, port, user, password, excluded, encrypted";

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    codec: Codec,
}

impl SqliteStore {
    /// Create a store from an already-migrated pool.
    pub fn new(pool: SqlitePool, codec: Codec) -> Self {
        Self { pool, codec }
    }

    /// Connect to a database URL, creating the file and parent directory if needed,
    /// and run migrations.
    pub async fn connect(url: &str, codec: Codec) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self::new(pool, codec))
    }

    /// Private in-memory database, migrated and ready. Used by tests and mock runs.
    pub async fn in_memory(codec: Codec) -> Result<Self> {
        // Every connection to :memory: is a separate database; pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self::new(pool, codec))
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_identity_row(&self, id: i64) -> Result<IdentityRow> {
        sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            kind: "identity",
            id,
        })
    }

    async fn fetch_proxy_row(&self, id: i64) -> Result<ProxyRow> {
        sqlx::query_as::<_, ProxyRow>(&format!("SELECT {PROXY_COLUMNS} FROM proxies WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound { kind: "proxy", id })
    }

    async fn task_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn fetch_report(&self, task: i64) -> Result<Option<TaskReport>> {
        let row = sqlx::query_as::<_, TaskReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM task_reports WHERE task = ?"
        ))
        .bind(task)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TaskReport::from))
    }
}

/// Map unique-constraint violations to [`StoreError::Conflict`].
fn conflict(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_task(&self, task: &Task) -> Result<Task> {
        let data = serde_json::to_string(&task.data)?;
        let id = sqlx::query(
            r#"
            INSERT INTO tasks (name, addon, image, data, status, error, job, created)
            VALUES (?, ?, '', ?, '', '', '', ?)
            "#,
        )
        .bind(&task.name)
        .bind(&task.addon)
        .bind(data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(task = id, name = %task.name, addon = %task.addon, "Task created");

        self.get_task(id).await
    }

    async fn get_task(&self, id: i64) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { kind: "task", id })?;

        Task::try_from(row)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows =
            sqlx::query_as::<_, TaskRow>(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<TaskEntry>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = ? ORDER BY id"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                Task::try_from(row).map_err(|error| CorruptTask { id, error })
            })
            .collect())
    }

    async fn fail_task(&self, id: i64, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, error = ?, terminated = ? WHERE id = ?",
        )
        .bind(TaskStatus::Failed.as_str())
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "task", id });
        }
        Ok(())
    }

    async fn update_task_state(&self, task: &Task) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET image = ?, status = ?, error = ?, started = ?, terminated = ?, job = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.image)
        .bind(task.status.as_str())
        .bind(&task.error)
        .bind(task.started)
        .bind(task.terminated)
        .bind(&task.job)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "task",
                id: task.id,
            });
        }
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "task", id });
        }
        Ok(())
    }

    async fn get_report(&self, task: i64) -> Result<Option<TaskReport>> {
        self.fetch_report(task).await
    }

    async fn create_report(&self, report: &TaskReport) -> Result<TaskReport> {
        if !self.task_exists(report.task).await? {
            return Err(StoreError::NotFound {
                kind: "task",
                id: report.task,
            });
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO task_reports (task, status, error, total, completed, activity, created, updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(task) DO UPDATE SET
                status = excluded.status,
                error = excluded.error,
                total = excluded.total,
                completed = excluded.completed,
                activity = excluded.activity,
                updated = excluded.updated
            "#,
        )
        .bind(report.task)
        .bind(&report.status)
        .bind(&report.error)
        .bind(report.total)
        .bind(report.completed)
        .bind(&report.activity)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch_report(report.task)
            .await?
            .ok_or(StoreError::NotFound {
                kind: "report",
                id: report.task,
            })
    }

    async fn update_report(&self, report: &TaskReport) -> Result<TaskReport> {
        let result = sqlx::query(
            r#"
            UPDATE task_reports
            SET status = ?, error = ?, total = ?, completed = ?, activity = ?, updated = ?
            WHERE task = ?
            "#,
        )
        .bind(&report.status)
        .bind(&report.error)
        .bind(report.total)
        .bind(report.completed)
        .bind(&report.activity)
        .bind(Utc::now())
        .bind(report.task)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "report",
                id: report.task,
            });
        }

        self.fetch_report(report.task)
            .await?
            .ok_or(StoreError::NotFound {
                kind: "report",
                id: report.task,
            })
    }

    async fn create_identity(&self, identity: &Identity) -> Result<Identity> {
        let mut row = IdentityRow::from(identity.clone());
        row.encrypted.clear();
        self.codec.encrypt(&mut row)?;

        let id = sqlx::query(
            r#"
            INSERT INTO identities (kind, name, description, user, password, key, settings, encrypted, created)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.kind)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.user)
        .bind(&row.password)
        .bind(&row.key)
        .bind(&row.settings)
        .bind(&row.encrypted)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, &format!("identity '{}'", row.name)))?
        .last_insert_rowid();

        debug!(identity = id, kind = %row.kind, "Identity created");

        self.get_identity(id).await
    }

    async fn get_identity(&self, id: i64) -> Result<Identity> {
        Ok(self.fetch_identity_row(id).await?.into())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Identity::from).collect())
    }

    async fn update_identity(&self, identity: &Identity) -> Result<Identity> {
        let stored = self.fetch_identity_row(identity.id).await?;

        let mut row = IdentityRow::from(identity.clone());
        row.encrypted = stored.encrypted;
        self.codec.encrypt(&mut row)?;

        sqlx::query(
            r#"
            UPDATE identities
            SET kind = ?, name = ?, description = ?,
                user = ?, password = ?, key = ?, settings = ?, encrypted = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.kind)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.user)
        .bind(&row.password)
        .bind(&row.key)
        .bind(&row.settings)
        .bind(&row.encrypted)
        .bind(row.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, &format!("identity '{}'", row.name)))?;

        self.get_identity(row.id).await
    }

    async fn delete_identity(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM identities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "identity",
                id,
            });
        }
        Ok(())
    }

    async fn create_proxy(&self, proxy: &Proxy) -> Result<Proxy> {
        let mut row = ProxyRow::try_from(proxy.clone())?;
        row.encrypted.clear();
        self.codec.encrypt(&mut row)?;

        let id = sqlx::query(
            r#"
            INSERT INTO proxies (enabled, kind, host, port, user, password, excluded, encrypted, created)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.enabled)
        .bind(&row.kind)
        .bind(&row.host)
        .bind(row.port)
        .bind(&row.user)
        .bind(&row.password)
        .bind(&row.excluded)
        .bind(&row.encrypted)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, &format!("proxy '{}'", row.kind)))?
        .last_insert_rowid();

        debug!(proxy = id, kind = %row.kind, "Proxy created");

        self.get_proxy(id).await
    }

    async fn get_proxy(&self, id: i64) -> Result<Proxy> {
        Proxy::try_from(self.fetch_proxy_row(id).await?)
    }

    async fn list_proxies(&self) -> Result<Vec<Proxy>> {
        let rows = sqlx::query_as::<_, ProxyRow>(&format!(
            "SELECT {PROXY_COLUMNS} FROM proxies ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Proxy::try_from).collect()
    }

    async fn update_proxy(&self, proxy: &Proxy) -> Result<Proxy> {
        let stored = self.fetch_proxy_row(proxy.id).await?;

        let mut row = ProxyRow::try_from(proxy.clone())?;
        row.encrypted = stored.encrypted;
        self.codec.encrypt(&mut row)?;

        sqlx::query(
            r#"
            UPDATE proxies
            SET enabled = ?, kind = ?, host = ?, port = ?,
                user = ?, password = ?, excluded = ?, encrypted = ?
            WHERE id = ?
            "#,
        )
        .bind(row.enabled)
        .bind(&row.kind)
        .bind(&row.host)
        .bind(row.port)
        .bind(&row.user)
        .bind(&row.password)
        .bind(&row.excluded)
        .bind(&row.encrypted)
        .bind(row.id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, &format!("proxy '{}'", row.kind)))?;

        self.get_proxy(row.id).await
    }

    async fn delete_proxy(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM proxies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "proxy", id });
        }
        Ok(())
    }
}
