// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tackle hub control plane.
//!
//! Turns persisted tasks into Kubernetes Jobs, tracks them to completion and
//! serves the REST surface addons report progress through.
//!
//! ## Components
//!
//! - [`scheduler`]: the task manager loop (schedule pending, reconcile running).
//! - [`cluster`]: Kubernetes gateway and the Addon directory.
//! - [`store`]: SQLite record store with credential encryption on save.
//! - [`api`]: axum router for tasks, reports, identities and proxies.
//! - [`runtime`]: embeddable runtime wiring all of the above.

pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod model;
pub mod runtime;
pub mod scheduler;
pub mod store;

pub use error::{Error, Result};
