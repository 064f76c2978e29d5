// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task context injected into an addon pod.
//!
//! The hub writes an [`AddonSecret`] as JSON into a Kubernetes Secret and mounts
//! it into the pod. The addon locates the file through [`env::ADDON_SECRET_PATH`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variables set on every addon container.
pub mod env {
    /// Hub base URL the addon calls back to.
    pub const HUB_BASE_URL: &str = "HUB_BASE_URL";
    /// Path of the mounted secret file.
    pub const ADDON_SECRET_PATH: &str = "ADDON_SECRET_PATH";
    /// Mount path of the shared bucket volume.
    pub const ADDON_BUCKET_PATH: &str = "ADDON_BUCKET_PATH";
}

/// Key (and file name) of the payload inside the Secret.
pub const SECRET_FILE: &str = "secret.json";

/// Payload of the per-task Secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonSecret {
    /// Hub-side task context.
    pub hub: HubSecret,
    /// Opaque addon input copied from the task.
    #[serde(default)]
    pub addon: Value,
}

/// Hub-side task context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSecret {
    /// Task ID the addon reports against.
    pub task: i64,
    /// Bearer token for hub calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Credential decryption material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
}

/// Credential decryption material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    /// Passphrase used to decrypt identity and proxy credentials.
    pub passphrase: String,
}

impl AddonSecret {
    /// Build the payload for a task.
    pub fn new(task: i64, addon: Value) -> Self {
        Self {
            hub: HubSecret {
                task,
                token: None,
                encryption: None,
            },
            addon,
        }
    }

    /// Set the hub bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.hub.token = Some(token.into());
        self
    }

    /// Set the credential passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.hub.encryption = Some(Encryption {
            passphrase: passphrase.into(),
        });
        self
    }

    /// The credential passphrase, if one was injected.
    pub fn passphrase(&self) -> Option<&str> {
        self.hub.encryption.as_ref().map(|e| e.passphrase.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_payload_shape() {
        let secret = AddonSecret::new(42, json!({"application": 3}));
        let encoded = serde_json::to_value(&secret).unwrap();
        assert_eq!(
            encoded,
            json!({"hub": {"task": 42}, "addon": {"application": 3}})
        );
    }

    #[test]
    fn test_full_payload_roundtrip() {
        let secret = AddonSecret::new(7, json!(null))
            .with_token("abc")
            .with_passphrase("p1");
        let bytes = serde_json::to_vec(&secret).unwrap();
        let decoded: AddonSecret = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.hub.token.as_deref(), Some("abc"));
        assert_eq!(decoded.passphrase(), Some("p1"));
    }
}
