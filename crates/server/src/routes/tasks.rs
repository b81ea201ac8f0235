use axum::{
    Extension, Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::task::{CreateTask, DeleteTaskResponse, Task, TaskStatus, UpdateTask};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::load_task_middleware};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let Query(query) = query?;
    let tasks = deployment
        .tasks()
        .list_tasks(&deployment.db().pool, query.status)
        .await?;

    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let Json(payload) = payload?;
    tracing::debug!("Creating task '{}'", payload.title);

    let task = deployment
        .tasks()
        .create_task(&deployment.db().pool, payload)
        .await?;

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    State(deployment): State<DeploymentImpl>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let Json(payload) = payload?;

    let task = deployment
        .tasks()
        .update_task(&deployment.db().pool, existing_task.id, payload)
        .await?;

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DeleteTaskResponse>>, ApiError> {
    let deleted = deployment
        .tasks()
        .delete_task(&deployment.db().pool, task.id)
        .await?;

    Ok(ResponseJson(ApiResponse::success(deleted)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route(
            "/",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
        .layer(from_fn_with_state(deployment.clone(), load_task_middleware));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}
