// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Addon directory entry.
//!
//! Addons are registered out-of-band as `Addon` custom resources in the hub's
//! namespace. The scheduler only ever reads them.

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named container image for a class of addon work.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "tackle.konveyor.io",
    version = "v1alpha1",
    kind = "Addon",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    /// Container image reference.
    pub image: String,
    /// Pull policy applied to the addon container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    /// Container resource requirements, in the core/v1 shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
}

impl AddonSpec {
    /// Spec running the given image with defaults for everything else.
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Typed resource requirements. Entries that do not parse are ignored.
    pub fn resource_requirements(&self) -> Option<ResourceRequirements> {
        self.resources
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}
