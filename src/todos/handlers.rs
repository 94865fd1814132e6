use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{
        CreateTodoRequest, DeleteTodoRequest, ListQuery, MessageResponse, TodoResponse,
        TodosResponse, UpdateTodoRequest,
    },
    repo_types::{NewTodo, TodoPatch},
};
use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new().route(
        "/todos",
        get(list_todos)
            .post(create_todo)
            .put(update_todo)
            .delete(delete_todo),
    )
}

/// A client may name the owner explicitly; it has to be the caller.
fn ensure_owner(claimed: Option<&str>, user_id: Uuid) -> Result<(), ApiError> {
    match claimed.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(()),
        Some(c) if c.parse::<Uuid>().ok() == Some(user_id) => Ok(()),
        Some(_) => Err(ApiError::Forbidden(
            "Cannot access another user's todos".into(),
        )),
    }
}

fn title_or_error(title: Option<String>) -> Result<String, ApiError> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Title is required"))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<Json<TodosResponse>, ApiError> {
    ensure_owner(q.user_id.as_deref(), user_id)?;
    let todos = state
        .todos
        .list_by_owner(user_id)
        .await
        .map_err(ApiError::storage)?;
    Ok(Json(TodosResponse { todos }))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    ensure_owner(payload.user_id.as_deref(), user_id)?;
    let new = NewTodo {
        title: title_or_error(payload.title)?,
        description: payload.description.unwrap_or_default(),
        status: payload.status.unwrap_or_default(),
    };
    let todo = state
        .todos
        .create(user_id, new)
        .await
        .map_err(ApiError::storage)?;
    info!(%user_id, todo_id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(TodoResponse { todo })))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let title = match payload.title {
        Some(t) => Some(title_or_error(Some(t))?),
        None => None,
    };
    let patch = TodoPatch {
        title,
        description: payload.description,
        status: payload.status,
    };
    let todo = state
        .todos
        .update(user_id, payload.id, patch)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::not_found("Todo not found"))?;
    info!(%user_id, todo_id = todo.id, status = %todo.status, "todo updated");
    Ok(Json(TodoResponse { todo }))
}

#[instrument(skip(state, payload))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<DeleteTodoRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .todos
        .delete(user_id, payload.id)
        .await
        .map_err(ApiError::storage)?;
    if !removed {
        return Err(ApiError::not_found("Todo not found"));
    }
    info!(%user_id, todo_id = payload.id, "todo deleted");
    Ok(Json(MessageResponse {
        message: "Todo deleted".into(),
    }))
}
