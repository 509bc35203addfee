//! Task endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use crm_core::models::{Task, TaskView};
use crm_core::{ApiResponse, Page, TaskId, UserId};

use super::{Envelope, created};
use crate::db::{TaskFilter, TaskRepository};
use crate::error::{AppError, Result};
use crate::extract::{Id, JsonBody, ListParams, QueryParams};
use crate::middleware::CurrentUser;
use crate::models::{InputDocument, TaskInput};
use crate::services::RelationLoader;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(index).post(create))
        .route("/tasks/{id}", get(show).put(update).delete(destroy))
        .route("/tasks/{id}/complete", put(complete))
}

async fn find(state: &AppState, caller: &CurrentUser, id: TaskId) -> Result<Task> {
    TaskRepository::new(state.pool())
        .get(id, state.owner_scope(caller.user.id))
        .await?
        .ok_or_else(|| AppError::not_found("Task"))
}

/// The caller's tasks, filterable by status and assignee.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn index(
    State(state): State<AppState>,
    caller: CurrentUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Page<TaskView>>> {
    let page = params.page_request(&state.config().pagination);
    let filter = TaskFilter {
        status: params.status,
        assigned_to: params.assigned_to.map(UserId::new),
    };
    let (rows, total) = TaskRepository::new(state.pool())
        .list(caller.user.id, &filter, page)
        .await?;
    let views = RelationLoader::new(state.pool()).tasks(rows).await?;

    Ok(Json(Page::new(views, page.page, page.per_page, total)))
}

/// # Errors
///
/// Returns 404 if the task does not exist.
pub async fn show(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<TaskId>,
) -> Result<Envelope<TaskView>> {
    let task = find(&state, &caller, id).await?;
    let view = RelationLoader::new(state.pool()).task(task).await?;

    Ok(Json(ApiResponse::data(view)))
}

/// Create a task, assigned to the caller unless `assigned_to` is given.
///
/// # Errors
///
/// Returns 422 if validation fails or the assignee is unknown.
#[instrument(skip_all, fields(user_id = %caller.user.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Envelope<TaskView>)> {
    let input = TaskInput::from_body(body)?;
    let task = TaskRepository::new(state.pool())
        .create(caller.user.id, &input)
        .await?;
    tracing::info!(task_id = %task.id, assigned_to = %task.assigned_to, "Task created");

    let view = RelationLoader::new(state.pool()).task(task).await?;
    Ok(created("Task created successfully", view))
}

/// # Errors
///
/// Returns 404 if the task does not exist and 422 if the merged document
/// fails validation.
#[instrument(skip_all, fields(user_id = %caller.user.id, task_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<TaskId>,
    JsonBody(body): JsonBody,
) -> Result<Envelope<TaskView>> {
    let current = find(&state, &caller, id).await?;
    let input = TaskInput::from(&current).merge(body)?;

    let task = TaskRepository::new(state.pool())
        .update(id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Task"))?;

    let view = RelationLoader::new(state.pool()).task(task).await?;
    Ok(Json(ApiResponse::with_message("Task updated successfully", view)))
}

/// Mark a task completed. Takes no body.
///
/// # Errors
///
/// Returns 404 if the task does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, task_id = %id))]
pub async fn complete(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<TaskId>,
) -> Result<Envelope<TaskView>> {
    find(&state, &caller, id).await?;

    let task = TaskRepository::new(state.pool())
        .complete(id)
        .await?
        .ok_or_else(|| AppError::not_found("Task"))?;
    tracing::info!("Task completed");

    let view = RelationLoader::new(state.pool()).task(task).await?;
    Ok(Json(ApiResponse::with_message("Task completed successfully", view)))
}

/// # Errors
///
/// Returns 404 if the task does not exist.
#[instrument(skip_all, fields(user_id = %caller.user.id, task_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    caller: CurrentUser,
    Id(id): Id<TaskId>,
) -> Result<Envelope<()>> {
    let deleted = TaskRepository::new(state.pool())
        .delete(id, state.owner_scope(caller.user.id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("Task"));
    }

    tracing::info!("Task deleted");
    Ok(Json(ApiResponse::message("Task deleted successfully")))
}
