// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task and task report wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task lifecycle status.
///
/// The progression is strictly one-way: `Created -> Running -> {Succeeded | Failed}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Persisted but not yet scheduled. Serialized as an empty string.
    #[default]
    #[serde(rename = "")]
    Created,
    /// A Job has been created for the task.
    Running,
    /// The Job finished successfully.
    Succeeded,
    /// The Job failed, or the task could not be scheduled.
    Failed,
}

impl TaskStatus {
    /// Succeeded and Failed are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "",
            TaskStatus::Running => "Running",
            TaskStatus::Succeeded => "Succeeded",
            TaskStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(TaskStatus::Created),
            "Running" => Ok(TaskStatus::Running),
            "Succeeded" => Ok(TaskStatus::Succeeded),
            "Failed" => Ok(TaskStatus::Failed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// A task as exchanged over the hub REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Task ID assigned by the hub.
    pub id: i64,
    /// Human-readable name. Also used as the prefix of generated cluster names.
    pub name: String,
    /// Name of the addon that executes the task.
    pub addon: String,
    /// Container image, copied from the resolved addon when scheduled.
    pub image: String,
    /// Opaque addon input.
    pub data: Value,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Free-text diagnostic when the task failed.
    pub error: String,
    /// When the task started running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminated: Option<DateTime<Utc>>,
    /// `namespace/name` of the Job; empty until scheduled.
    pub job: String,
    /// When the task was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Latest progress report written by the addon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TaskReport>,
}

/// Progress record written by a running addon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskReport {
    /// Reported status (Running, Succeeded, Failed).
    pub status: String,
    /// Free-text error reported by the addon.
    pub error: String,
    /// Expected number of items.
    pub total: i64,
    /// Number of completed items.
    pub completed: i64,
    /// Current activity description.
    pub activity: String,
    /// Owning task ID.
    pub task: i64,
}
