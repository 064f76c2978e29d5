// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hub REST API.
//!
//! - `/tasks`, `/tasks/{id}`: submit, inspect and delete tasks.
//! - `/tasks/{id}/report`: progress written by the running addon.
//! - `/identities`, `/proxies`: credential stores, encrypted at rest.

pub mod error;
mod identities;
mod proxies;
mod tasks;

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use tower_http::trace::TraceLayer;

use crate::cluster::Cluster;
use crate::store::Store;
use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Record store.
    pub store: Arc<dyn Store>,
    /// Cluster gateway, used to delete Jobs with their tasks.
    pub cluster: Arc<dyn Cluster>,
}

impl AppState {
    /// Create handler state.
    pub fn new(store: Arc<dyn Store>, cluster: Arc<dyn Cluster>) -> Self {
        Self { store, cluster }
    }
}

/// Build the hub router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(tasks::routes())
        .merge(identities::routes())
        .merge(proxies::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("not found: {}", uri.path()))
}
