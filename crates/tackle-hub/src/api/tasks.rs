// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task and task report endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tackle_api::{Task, TaskReport};
use tracing::{info, warn};

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::scheduler::{job, parse_job_reference};

/// Task routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).delete(delete_task))
        .route(
            "/tasks/{id}/report",
            get(get_report).post(create_report).put(update_report),
        )
}

async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<Task>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(task) = body?;
    if task.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if task.addon.trim().is_empty() {
        return Err(ApiError::BadRequest("addon is required".to_string()));
    }

    let created = state.store.create_task(&task).await?;
    info!(task = created.id, addon = %created.addon, "Task submitted");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.store.list_tasks().await?))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Task>> {
    let mut task = state.store.get_task(id).await?;
    task.report = state.store.get_report(id).await?;
    Ok(Json(task))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let task = state.store.get_task(id).await?;

    if !task.job.is_empty() {
        let (namespace, name) = parse_job_reference(&task.job)?;
        match state.cluster.delete_job(namespace, name).await {
            Ok(()) => info!(task = id, job = %task.job, "Job deleted"),
            Err(e) if e.is_not_found() => {
                warn!(task = id, job = %task.job, "Job already gone")
            }
            Err(e) => return Err(e.into()),
        }
        state
            .cluster
            .delete_secrets(namespace, &job::task_selector(id))
            .await?;
    }

    state.store.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskReport>> {
    state
        .store
        .get_report(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("report for task {} not found", id)))
}

async fn create_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<TaskReport>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskReport>)> {
    let Json(mut report) = body?;
    report.task = id;
    let created = state.store.create_report(&report).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<TaskReport>, JsonRejection>,
) -> ApiResult<Json<TaskReport>> {
    let Json(mut report) = body?;
    report.task = id;
    Ok(Json(state.store.update_report(&report).await?))
}
