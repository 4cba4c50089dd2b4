use crate::entities::sea_orm_active_enums::Category;
use crate::todo::{Todo, TodoService, TodoServiceError};
use crate::web::{MessageResponse, ServerErrorResponse};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

const TODO_NOT_FOUND: &str = "Todo not found";

#[derive(Clone, Debug)]
pub struct TodoState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// JSON representation of a Todo for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct TodoJson {
    /// Identifier assigned on creation
    id: i32,
    /// Title of the todo
    title: String,
    /// Workflow stage
    category: Category,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id(),
            title: todo.title().to_string(),
            category: todo.category(),
        }
    }
}

/// Request body for creating a todo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTodoRequest {
    title: String,
    /// Defaults to `backlog` when omitted
    #[serde(default)]
    category: Category,
}

/// Request body for updating a todo. Any `id` field in the body is ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTodoRequest {
    title: String,
    #[serde(default)]
    category: Category,
}

/// Payload returned in place of a todo when the requested ID does not exist.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotFoundResponse {
    error: String,
}

impl NotFoundResponse {
    fn todo() -> Self {
        Self {
            error: TODO_NOT_FOUND.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum UpdateTodoResponse {
    Updated(TodoJson),
    NotFound(NotFoundResponse),
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DeleteTodoResponse {
    Deleted(MessageResponse),
    NotFound(NotFoundResponse),
}

type ApiError = (StatusCode, Json<ServerErrorResponse>);

fn storage_failure(action: &str, err: TodoServiceError) -> ApiError {
    tracing::error!("Failed to {}: {}", action, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ServerErrorResponse::new(format!("Failed to {}", action))),
    )
}

/// Handler for GET /todos - Returns every stored todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/todos",
    responses(
        (status = 200, description = "Successfully retrieved todos", body = Vec<TodoJson>),
        (status = 500, description = "Internal server error", body = ServerErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todos_handler(
    State(state): State<Arc<TodoState>>,
) -> Result<Json<Vec<TodoJson>>, ApiError> {
    let service = TodoService::new(&state.db);
    let todos = service
        .get_all_todos()
        .await
        .map_err(|err| storage_failure("retrieve todos", err))?;

    Ok(Json(todos.into_iter().map(TodoJson::from).collect()))
}

/// Handler for POST /todos - Creates a todo with the smallest unused ID.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 200, description = "Todo created", body = TodoJson),
        (status = 422, description = "Malformed request body"),
        (status = 500, description = "Internal server error", body = ServerErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    Json(payload): Json<CreateTodoRequest>,
) -> Result<Json<TodoJson>, ApiError> {
    let service = TodoService::new(&state.db);
    let todo = service
        .create_todo(payload.title, payload.category)
        .await
        .map_err(|err| storage_failure("create todo", err))?;

    Ok(Json(TodoJson::from(todo)))
}

/// Handler for PUT /todos/{id} - Overwrites title and category of an existing todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/todos/{id}",
    params(
        ("id" = i32, Path, description = "ID of the todo to update")
    ),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "The updated todo, or a not-found payload", body = UpdateTodoResponse),
        (status = 422, description = "Malformed request body"),
        (status = 500, description = "Internal server error", body = ServerErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTodoRequest>,
) -> Result<Json<UpdateTodoResponse>, ApiError> {
    let service = TodoService::new(&state.db);

    match service
        .update_todo_by_id(id, payload.title, payload.category)
        .await
    {
        Ok(todo) => Ok(Json(UpdateTodoResponse::Updated(TodoJson::from(todo)))),
        Err(TodoServiceError::TodoNotFound(_)) => {
            Ok(Json(UpdateTodoResponse::NotFound(NotFoundResponse::todo())))
        }
        Err(err) => Err(storage_failure("update todo", err)),
    }
}

/// Handler for DELETE /todos/{id} - Permanently removes a todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(
        ("id" = i32, Path, description = "ID of the todo to delete")
    ),
    responses(
        (status = 200, description = "Deletion message, or a not-found payload", body = DeleteTodoResponse),
        (status = 500, description = "Internal server error", body = ServerErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteTodoResponse>, ApiError> {
    let service = TodoService::new(&state.db);

    match service.delete_todo_by_id(id).await {
        Ok(()) => Ok(Json(DeleteTodoResponse::Deleted(MessageResponse::new(
            "Todo deleted",
        )))),
        Err(TodoServiceError::TodoNotFound(_)) => {
            Ok(Json(DeleteTodoResponse::NotFound(NotFoundResponse::todo())))
        }
        Err(err) => Err(storage_failure("delete todo", err)),
    }
}

/// Creates and returns the todos API router.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todos", get(get_todos_handler).post(create_todo_handler))
        .route(
            "/todos/{id}",
            put(update_todo_handler).delete(delete_todo_handler),
        )
        .with_state(state)
}
