// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Proxy endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tackle_api::Proxy;

use super::AppState;
use super::error::{ApiError, ApiResult};

/// Proxy routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/proxies", get(list_proxies).post(create_proxy))
        .route(
            "/proxies/{id}",
            get(get_proxy).put(update_proxy).delete(delete_proxy),
        )
}

async fn create_proxy(
    State(state): State<AppState>,
    body: Result<Json<Proxy>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Proxy>)> {
    let Json(proxy) = body?;
    if proxy.kind.trim().is_empty() {
        return Err(ApiError::BadRequest("kind is required".to_string()));
    }
    let created = state.store.create_proxy(&proxy).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_proxies(State(state): State<AppState>) -> ApiResult<Json<Vec<Proxy>>> {
    Ok(Json(state.store.list_proxies().await?))
}

async fn get_proxy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Proxy>> {
    Ok(Json(state.store.get_proxy(id).await?))
}

async fn update_proxy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<Proxy>, JsonRejection>,
) -> ApiResult<Json<Proxy>> {
    let Json(mut proxy) = body?;
    proxy.id = id;
    Ok(Json(state.store.update_proxy(&proxy).await?))
}

async fn delete_proxy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.store.delete_proxy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
