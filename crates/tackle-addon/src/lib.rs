// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime adapter for tackle addons.
//!
//! An addon binary wraps its work in [`Addon::run`]. The adapter reads the task
//! context the hub mounted into the pod, reports progress back to the hub and
//! turns any failure of the work, panics included, into a Failed report before
//! exiting.
//!
//! ```ignore
//! use tackle_addon::Addon;
//!
//! #[derive(serde::Deserialize)]
//! struct Input {
//!     application: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tackle_addon::AddonError> {
//!     let addon = Addon::from_env()?;
//!     addon
//!         .run(|addon| async move {
//!             let input: Input = addon.data_with()?;
//!             let app = addon.applications().get(input.application).await?;
//!             addon.activity(format!("analyzing {}", app.name)).await?;
//!             addon.total(1).await?;
//!             addon.increment().await?;
//!             Ok(())
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod resources;

pub use adapter::{Addon, Outcome, WorkError};
pub use client::HubClient;
pub use config::AddonConfig;
pub use error::{AddonError, Result};
pub use resources::{Buckets, Credentials, Resource, Settings};
