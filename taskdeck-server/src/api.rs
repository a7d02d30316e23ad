//! Task routes.
//!
//! Each handler authenticates first (the [`Authenticated`] extractor), then
//! validates the id and payload, then performs one owner-scoped store
//! operation. Only a successful mutation publishes a change event.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::Value;
use taskdeck_proto::api::{DeletedEnvelope, StatsEnvelope, TaskEnvelope, TaskList};
use taskdeck_proto::event::TaskEvent;
use taskdeck_proto::input::{NewTask, TaskPatch};
use taskdeck_proto::query::ListParams;
use taskdeck_proto::task::TaskId;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::server::AppState;

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid task ID".to_string()))
}

/// `GET /api/tasks`
pub async fn list_tasks(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<TaskList>, ApiError> {
    let Query(params) = params?;
    let query = params.parse()?;
    let tasks = state.store.list(&auth.user_id, &query).await;
    Ok(Json(TaskList::new(tasks)))
}

/// `GET /api/tasks/stats`
pub async fn task_stats(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
) -> Json<StatsEnvelope> {
    let stats = state.store.stats(&auth.user_id).await;
    Json(StatsEnvelope { stats })
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let task = state.store.get(&auth.user_id, &id).await?;
    Ok(Json(TaskEnvelope {
        message: None,
        task,
    }))
}

/// `POST /api/tasks`
pub async fn create_task(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    let Json(body) = body?;
    let input = NewTask::from_json(&body)?;
    let task = state.store.create(&auth.user_id, input, Utc::now()).await?;
    tracing::info!(owner_id = %auth.user_id, task_id = %task.id, "task created");

    state
        .hub
        .publish(&auth.user_id, &TaskEvent::TaskCreated { task: task.clone() })
        .await;
    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            message: Some("Task created successfully".to_string()),
            task,
        }),
    ))
}

/// `PUT /api/tasks/{id}`
pub async fn update_task(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let patch = TaskPatch::from_json(&body)?;
    apply_patch(&auth, &state, &id, patch, "Task updated successfully").await
}

/// `PATCH /api/tasks/{id}/status`
pub async fn update_status(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let patch = TaskPatch::status_from_json(&body)?;
    apply_patch(&auth, &state, &id, patch, "Task status updated successfully").await
}

async fn apply_patch(
    auth: &Authenticated,
    state: &AppState,
    id: &TaskId,
    patch: TaskPatch,
    message: &str,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let task = state
        .store
        .update(&auth.user_id, id, patch, Utc::now())
        .await?;
    tracing::info!(
        owner_id = %auth.user_id,
        task_id = %task.id,
        status = %task.status,
        "task updated"
    );

    state
        .hub
        .publish(&auth.user_id, &TaskEvent::TaskUpdated { task: task.clone() })
        .await;
    Ok(Json(TaskEnvelope {
        message: Some(message.to_string()),
        task,
    }))
}

/// `DELETE /api/tasks/{id}`
pub async fn delete_task(
    auth: Authenticated,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let removed = state.store.delete(&auth.user_id, &id).await?;
    tracing::info!(owner_id = %auth.user_id, task_id = %removed.id, "task deleted");

    state
        .hub
        .publish(
            &auth.user_id,
            &TaskEvent::TaskDeleted {
                task_id: removed.id.clone(),
            },
        )
        .await;
    Ok(Json(DeletedEnvelope {
        message: "Task deleted successfully".to_string(),
        task_id: removed.id,
    }))
}
