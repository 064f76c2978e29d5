// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared contract between the tackle hub and its addons.
//!
//! - [`task`]: Task and TaskReport wire types.
//! - [`resource`]: hub resources addons read (applications, identities, ...).
//! - [`secret`]: payload of the per-task Secret and the pod environment contract.
//! - [`encryption`]: AES-256-GCM codec for credential fields.

pub mod encryption;
pub mod resource;
pub mod secret;
pub mod task;

pub use encryption::{Codec, CodecError, Encryptable, IdentitySecret, ProxySecret, SecretFields};
pub use resource::{
    Application, Artifact, Bucket, Identity, Proxy, Ref, Repository, Setting, Tag, TagType,
};
pub use secret::{AddonSecret, Encryption, HubSecret, SECRET_FILE};
pub use task::{Task, TaskReport, TaskStatus};
