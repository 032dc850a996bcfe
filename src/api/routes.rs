use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    api::AppState,
    codec,
    types::{derive_view, FilterSelection, NewTask, Task, TaskPatch},
};

use super::models::{ApiError, DeleteResponse, TaskListResponse};

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

// List tasks matching the query filter, with counts over the whole collection
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    filter: std::result::Result<Query<FilterSelection>, QueryRejection>,
) -> ApiResult<Json<TaskListResponse>> {
    let Query(filter) = filter?;
    let tasks = state.repository.get_all().await?;
    Ok(Json(derive_view(&tasks, &filter).into()))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = codec::parse_id(&raw_id)?;
    Ok(Json(state.repository.get_by_id(id).await?))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    request: std::result::Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(request) = request?;
    let task = state.repository.create(request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    patch: std::result::Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = codec::parse_id(&raw_id)?;
    let Json(patch) = patch?;
    Ok(Json(state.repository.update(id, patch).await?))
}

pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = codec::parse_id(&raw_id)?;
    let current = state.repository.get_by_id(id).await?;
    let patch = TaskPatch::toggle_completion(&current, Utc::now());
    Ok(Json(state.repository.update(id, patch).await?))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = codec::parse_id(&raw_id)?;
    let deleted = state.repository.delete(id).await?;
    Ok(Json(DeleteResponse { deleted }))
}
