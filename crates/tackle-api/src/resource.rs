// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hub resources consumed by addons.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encryption::{Encryptable, IdentitySecret, ProxySecret};

/// Reference to another resource by ID and name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ref {
    pub id: i64,
    pub name: String,
}

/// Application in the hub inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    /// Binary artifact coordinates (e.g. maven GAV).
    pub binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<Ref>,
    pub identities: Vec<Ref>,
    pub tags: Vec<Ref>,
}

/// Source repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub id: i64,
    /// `git` or `svn`.
    pub kind: String,
    pub url: String,
    pub branch: String,
    pub tag: String,
    pub path: String,
}

/// Directory on the shared bucket volume owned by a hub resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bucket {
    pub id: i64,
    pub name: String,
    /// Path relative to the bucket volume root.
    pub path: String,
}

/// Stored credentials.
///
/// Sensitive fields (`user`, `password`, `key`, `settings`) travel in plaintext only
/// until the hub saves the record; afterwards they are folded into `encrypted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub id: i64,
    /// `source`, `maven`, `proxy` ...
    pub kind: String,
    pub name: String,
    pub description: String,
    pub user: String,
    pub password: String,
    pub key: String,
    pub settings: String,
    pub encrypted: String,
}

impl Encryptable for Identity {
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

/// HTTP(S) proxy settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proxy {
    pub id: i64,
    pub enabled: bool,
    /// `http` or `https`.
    pub kind: String,
    pub host: String,
    pub port: i32,
    pub user: String,
    pub password: String,
    /// Hosts that bypass the proxy.
    pub excluded: Vec<String>,
    pub encrypted: String,
}

impl Encryptable for Proxy {
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

/// Tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub tag_type: Ref,
}

/// Tag category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagType {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub rank: i32,
    pub tags: Vec<Ref>,
}

/// File produced by an addon, stored on the bucket volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub id: i64,
    pub name: String,
    /// Path relative to the bucket volume root.
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Ref>,
}

/// Hub setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setting {
    pub key: String,
    pub value: Value,
}
