// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Adapter configuration, read from the environment the hub sets on the pod.

use std::env;
use std::path::PathBuf;

use tackle_api::secret::env as vars;

use crate::error::{AddonError, Result};

/// Default location of the mounted secret file.
pub const DEFAULT_SECRET_PATH: &str = "/tmp/secret/secret.json";
/// Default mount path of the shared bucket volume.
pub const DEFAULT_BUCKET_PATH: &str = "/tmp/bucket";

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct AddonConfig {
    /// Hub base URL (required)
    pub hub_base_url: String,
    /// Path of the injected secret (default: "/tmp/secret/secret.json")
    pub secret_path: PathBuf,
    /// Bucket volume mount path (default: "/tmp/bucket")
    pub bucket_path: PathBuf,
    /// Request timeout in milliseconds (default: 30_000)
    pub request_timeout_ms: u64,
}

impl AddonConfig {
    /// Load configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `HUB_BASE_URL` - Hub the addon reports to
    ///
    /// # Optional Environment Variables
    /// - `ADDON_SECRET_PATH` - Mounted secret file (default: "/tmp/secret/secret.json")
    /// - `ADDON_BUCKET_PATH` - Shared bucket mount (default: "/tmp/bucket")
    /// - `ADDON_REQUEST_TIMEOUT_MS` - Request timeout (default: 30000)
    pub fn from_env() -> Result<Self> {
        let hub_base_url = env::var(vars::HUB_BASE_URL)
            .map_err(|_| AddonError::Config(format!("{} is required", vars::HUB_BASE_URL)))?;
        if hub_base_url.trim().is_empty() {
            return Err(AddonError::Config(format!(
                "{} must not be empty",
                vars::HUB_BASE_URL
            )));
        }

        let secret_path = env::var(vars::ADDON_SECRET_PATH)
            .unwrap_or_else(|_| DEFAULT_SECRET_PATH.to_string())
            .into();

        let bucket_path = env::var(vars::ADDON_BUCKET_PATH)
            .unwrap_or_else(|_| DEFAULT_BUCKET_PATH.to_string())
            .into();

        let request_timeout_ms = env::var("ADDON_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);

        Ok(Self {
            hub_base_url,
            secret_path,
            bucket_path,
            request_timeout_ms,
        })
    }

    /// Create a configuration for the given hub with default paths.
    pub fn new(hub_base_url: impl Into<String>) -> Self {
        Self {
            hub_base_url: hub_base_url.into(),
            secret_path: PathBuf::from(DEFAULT_SECRET_PATH),
            bucket_path: PathBuf::from(DEFAULT_BUCKET_PATH),
            request_timeout_ms: 30_000,
        }
    }

    /// Set the secret file path.
    pub fn with_secret_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.secret_path = path.into();
        self
    }

    /// Set the bucket mount path.
    pub fn with_bucket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bucket_path = path.into();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }
}
