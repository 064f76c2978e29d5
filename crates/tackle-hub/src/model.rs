// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage representations of hub records.
//!
//! Rows mirror the SQLite schema one-to-one and are never serialized over the
//! wire. Conversions to and from the [`tackle_api`] wire types are the only
//! bridge between the two layers.

use chrono::{DateTime, Utc};
use tackle_api::{
    Encryptable, Identity, IdentitySecret, Proxy, ProxySecret, Task, TaskReport, TaskStatus,
};

use crate::store::StoreError;

/// A row of the `tasks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub name: String,
    pub addon: String,
    pub image: String,
    /// JSON text of the opaque addon input.
    pub data: String,
    pub status: String,
    pub error: String,
    pub started: Option<DateTime<Utc>>,
    pub terminated: Option<DateTime<Utc>>,
    pub job: String,
    pub created: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("task {}: {}", row.id, e)))?;
        Ok(Task {
            id: row.id,
            name: row.name,
            addon: row.addon,
            image: row.image,
            data: serde_json::from_str(&row.data)?,
            status,
            error: row.error,
            started: row.started,
            terminated: row.terminated,
            job: row.job,
            created: Some(row.created),
            report: None,
        })
    }
}

/// A row of the `task_reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskReportRow {
    pub id: i64,
    pub task: i64,
    pub status: String,
    pub error: String,
    pub total: i64,
    pub completed: i64,
    pub activity: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<TaskReportRow> for TaskReport {
    fn from(row: TaskReportRow) -> Self {
        TaskReport {
            status: row.status,
            error: row.error,
            total: row.total,
            completed: row.completed,
            activity: row.activity,
            task: row.task,
        }
    }
}

/// A row of the `identities` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct IdentityRow {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub user: String,
    pub password: String,
    pub key: String,
    pub settings: String,
    pub encrypted: String,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            kind: row.kind,
            name: row.name,
            description: row.description,
            user: row.user,
            password: row.password,
            key: row.key,
            settings: row.settings,
            encrypted: row.encrypted,
        }
    }
}

impl From<Identity> for IdentityRow {
    fn from(m: Identity) -> Self {
        IdentityRow {
            id: m.id,
            kind: m.kind,
            name: m.name,
            description: m.description,
            user: m.user,
            password: m.password,
            key: m.key,
            settings: m.settings,
            encrypted: m.encrypted,
        }
    }
}

impl Encryptable for IdentityRow {
    type Secret = IdentitySecret;

    fn secret(&self) -> IdentitySecret {
        IdentitySecret {
            user: self.user.clone(),
            password: self.password.clone(),
            key: self.key.clone(),
            settings: self.settings.clone(),
        }
    }

    fn clear_secret(&mut self) {
        self.user.clear();
        self.password.clear();
        self.key.clear();
        self.settings.clear();
    }

    fn restore_secret(&mut self, secret: IdentitySecret) {
        self.user = secret.user;
        self.password = secret.password;
        self.key = secret.key;
        self.settings = secret.settings;
    }

    fn encrypted(&self) -> &str {
        &self.encrypted
    }

    fn set_encrypted(&mut self, blob: String) {
        self.encrypted = blob;
    }
}

/// A row of the `proxies` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ProxyRow {
    pub id: i64,
    pub enabled: bool,
    pub kind: String,
    pub host: String,
    pub port: i32,
    pub user: String,
    pub password: String,
    /// JSON array of excluded hosts.
    pub excluded: String,
    pub encrypted: String,
}

impl TryFrom<ProxyRow> for Proxy {
    type Error = StoreError;

    fn try_from(row: ProxyRow) -> Result<Self, Self::Error> {
        Ok(Proxy {
            id: row.id,
            enabled: row.enabled,
            kind: row.kind,
            host: row.host,
            port: row.port,
            user: row.user,
            password: row.password,
            excluded: serde_json::from_str(&row.excluded)?,
            encrypted: row.encrypted,
        })
    }
}

impl TryFrom<Proxy> for ProxyRow {
    type Error = StoreError;

    fn try_from(m: Proxy) -> Result<Self, Self::Error> {
        Ok(ProxyRow {
            id: m.id,
            enabled: m.enabled,
            kind: m.kind,
            host: m.host,
            port: m.port,
            user: m.user,
            password: m.password,
            excluded: serde_json::to_string(&m.excluded)?,
            encrypted: m.encrypted,
        })
    }
}

impl Encryptable for ProxyRow {
    type Secret = ProxySecret;

    fn secret(&self) -> ProxySecret {
        ProxySecret {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    fn clear_secret(&mut self) {
        self.user.clear();
        self.password.clear();
    }

    fn restore_secret(&mut self, secret: ProxySecret) {
        self.user = secret.user;
        self.password = secret.password;
    }

    fn encrypted(&self) -> &str {
        &self.encrypted
    }

    fn set_encrypted(&mut self, blob: String) {
        self.encrypted = blob;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_row(status: &str) -> TaskRow {
        TaskRow {
            id: 1,
            name: "windup".to_string(),
            addon: "windup".to_string(),
            image: String::new(),
            data: r#"{"application":3}"#.to_string(),
            status: status.to_string(),
            error: String::new(),
            started: None,
            terminated: None,
            job: String::new(),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_task_row_conversion() {
        let task = Task::try_from(task_row("")).unwrap();
        assert_eq!(task.status, TaskStatus::Created);
        assert_eq!(task.data["application"], 3);
        assert!(task.created.is_some());
    }

    #[test]
    fn test_task_row_unknown_status() {
        let err = Task::try_from(task_row("Exploded")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_proxy_excluded_roundtrip() {
        let proxy = Proxy {
            kind: "http".to_string(),
            excluded: vec!["localhost".to_string(), "*.svc".to_string()],
            ..Default::default()
        };
        let row = ProxyRow::try_from(proxy.clone()).unwrap();
        assert_eq!(row.excluded, r#"["localhost","*.svc"]"#);
        assert_eq!(Proxy::try_from(row).unwrap(), proxy);
    }
}
