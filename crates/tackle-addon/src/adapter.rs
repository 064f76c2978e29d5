// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task reporting and the top-level run boundary.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tackle_api::{AddonSecret, Codec, TaskReport, TaskStatus};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::client::HubClient;
use crate::config::AddonConfig;
use crate::error::{AddonError, Result};

/// Error type returned by addon work.
pub type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// How a unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Work returned `Ok` and the hub was told so.
    Succeeded,
    /// Work returned an error, panicked, or the hub could not be told.
    Failed(String),
}

impl Outcome {
    /// True for [`Outcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Handle to the task this pod was scheduled for.
///
/// Cheap to clone; clones share the same report state.
#[derive(Clone)]
pub struct Addon {
    inner: Arc<Inner>,
}

struct Inner {
    secret: AddonSecret,
    client: HubClient,
    codec: Option<Codec>,
    bucket_path: PathBuf,
    report: Mutex<TaskReport>,
}

impl std::fmt::Debug for Addon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Addon")
            .field("task", &self.task())
            .field("hub", &self.inner.client.base_url())
            .finish_non_exhaustive()
    }
}

impl Addon {
    /// Create an adapter from environment variables.
    ///
    /// See [`AddonConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self> {
        Self::new(AddonConfig::from_env()?)
    }

    /// Create an adapter, reading and decoding the injected secret once.
    pub fn new(config: AddonConfig) -> Result<Self> {
        let secret = load_secret(&config.secret_path)?;
        let client = HubClient::new(
            &config.hub_base_url,
            Duration::from_millis(config.request_timeout_ms),
            secret.hub.token.clone(),
        )?;
        let codec = secret.passphrase().map(Codec::new);

        info!(
            task = secret.hub.task,
            hub = %config.hub_base_url,
            "Addon context loaded"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                report: Mutex::new(TaskReport {
                    task: secret.hub.task,
                    ..Default::default()
                }),
                secret,
                client,
                codec,
                bucket_path: config.bucket_path,
            }),
        })
    }

    /// ID of the task being executed.
    pub fn task(&self) -> i64 {
        self.inner.secret.hub.task
    }

    /// Opaque addon input copied from the task.
    pub fn data(&self) -> &Value {
        &self.inner.secret.addon
    }

    /// Decode the addon input into `T`.
    pub fn data_with<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.inner.secret.addon.clone())?)
    }

    /// Hub client authenticated as this task.
    pub fn client(&self) -> &HubClient {
        &self.inner.client
    }

    /// Mount path of the shared bucket volume.
    pub fn bucket_path(&self) -> &Path {
        &self.inner.bucket_path
    }

    pub(crate) fn codec(&self) -> Option<&Codec> {
        self.inner.codec.as_ref()
    }

    /// Snapshot of the report as last sent.
    pub async fn report(&self) -> TaskReport {
        self.inner.report.lock().await.clone()
    }

    /// Run `work` and terminate the process with status 1 if it fails.
    ///
    /// Returns normally only when the work succeeded and was reported.
    pub async fn run<F, Fut>(self, work: F)
    where
        F: FnOnce(Addon) -> Fut,
        Fut: Future<Output = std::result::Result<(), WorkError>>,
    {
        if let Outcome::Failed(message) = self.execute(work).await {
            error!(task = self.task(), error = %message, "Addon failed");
            std::process::exit(1);
        }
    }

    /// Report Started, run `work`, then report Succeeded or Failed.
    ///
    /// Panics inside `work` are caught and reported as failures.
    #[instrument(skip_all, fields(task = self.task()))]
    pub async fn execute<F, Fut>(&self, work: F) -> Outcome
    where
        F: FnOnce(Addon) -> Fut,
        Fut: Future<Output = std::result::Result<(), WorkError>>,
    {
        let outcome = match self.started().await {
            Ok(()) => {
                let addon = self.clone();
                let result = AssertUnwindSafe(async move { work(addon).await })
                    .catch_unwind()
                    .await;
                match result {
                    Ok(Ok(())) => match self.succeeded().await {
                        Ok(()) => Outcome::Succeeded,
                        Err(e) => Outcome::Failed(format!("report succeeded: {}", e)),
                    },
                    Ok(Err(e)) => Outcome::Failed(e.to_string()),
                    Err(payload) => Outcome::Failed(panic_message(payload.as_ref())),
                }
            }
            Err(e) => Outcome::Failed(format!("report started: {}", e)),
        };

        if let Outcome::Failed(message) = &outcome
            && let Err(e) = self.failed(message.clone()).await
        {
            warn!(error = %e, "Could not report failure");
        }
        outcome
    }

    /// Report the task as started.
    #[instrument(skip(self), fields(task = self.task()))]
    pub async fn started(&self) -> Result<()> {
        self.create(|r| r.status = TaskStatus::Running.to_string())
            .await
    }

    /// Report the task as succeeded.
    #[instrument(skip(self), fields(task = self.task()))]
    pub async fn succeeded(&self) -> Result<()> {
        self.update(|r| {
            r.status = TaskStatus::Succeeded.to_string();
            r.error.clear();
        })
        .await
    }

    /// Report the task as failed with `message`.
    #[instrument(skip_all, fields(task = self.task()))]
    pub async fn failed(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.update(|r| {
            r.status = TaskStatus::Failed.to_string();
            r.error = message;
        })
        .await
    }

    /// Replace the current activity text.
    #[instrument(skip_all, fields(task = self.task()))]
    pub async fn activity(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.update(|r| r.activity = text).await
    }

    /// Set the expected number of items.
    #[instrument(skip(self), fields(task = self.task()))]
    pub async fn total(&self, n: i64) -> Result<()> {
        self.create(|r| r.total = n).await
    }

    /// Advance the completed count by one.
    #[instrument(skip(self), fields(task = self.task()))]
    pub async fn increment(&self) -> Result<()> {
        self.update(|r| r.completed += 1).await
    }

    /// Overwrite the completed count.
    #[instrument(skip(self), fields(task = self.task()))]
    pub async fn completed(&self, n: i64) -> Result<()> {
        self.update(|r| r.completed = n).await
    }

    async fn create(&self, change: impl FnOnce(&mut TaskReport)) -> Result<()> {
        let report = self.apply(change).await;
        self.inner.client.post(&self.report_path(), &report).await
    }

    async fn update(&self, change: impl FnOnce(&mut TaskReport)) -> Result<()> {
        let report = self.apply(change).await;
        self.inner.client.put(&self.report_path(), &report).await
    }

    async fn apply(&self, change: impl FnOnce(&mut TaskReport)) -> TaskReport {
        let mut report = self.inner.report.lock().await;
        change(&mut report);
        report.clone()
    }

    fn report_path(&self) -> String {
        format!("/tasks/{}/report", self.task())
    }
}

fn load_secret(path: &Path) -> Result<AddonSecret> {
    let bytes = std::fs::read(path).map_err(|source| AddonError::Secret {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}
