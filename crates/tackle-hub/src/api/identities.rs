// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Identity endpoints. Responses carry only the encrypted blob.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tackle_api::Identity;

use super::AppState;
use super::error::{ApiError, ApiResult};

/// Identity routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/identities", get(list_identities).post(create_identity))
        .route(
            "/identities/{id}",
            get(get_identity)
                .put(update_identity)
                .delete(delete_identity),
        )
}

async fn create_identity(
    State(state): State<AppState>,
    body: Result<Json<Identity>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Identity>)> {
    let Json(identity) = body?;
    if identity.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    let created = state.store.create_identity(&identity).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_identities(State(state): State<AppState>) -> ApiResult<Json<Vec<Identity>>> {
    Ok(Json(state.store.list_identities().await?))
}

async fn get_identity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Identity>> {
    Ok(Json(state.store.get_identity(id).await?))
}

async fn update_identity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<Identity>, JsonRejection>,
) -> ApiResult<Json<Identity>> {
    let Json(mut identity) = body?;
    identity.id = id;
    Ok(Json(state.store.update_identity(&identity).await?))
}

async fn delete_identity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.store.delete_identity(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
