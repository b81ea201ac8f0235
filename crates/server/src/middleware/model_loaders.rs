use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State, rejection::PathRejection},
    middleware::Next,
    response::Response,
};
use db::{DbErr, models::task::Task};
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

// Storage errors are logged once, when the ApiError is rendered.
async fn fetch_model_or_error<M, Id, Fut>(
    model_name: &'static str,
    model_id: Id,
    load_future: Fut,
) -> Result<M, ApiError>
where
    Id: Display,
    Fut: Future<Output = Result<Option<M>, DbErr>>,
{
    match load_future.await? {
        Some(model) => Ok(model),
        None => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(format!("{model_name} not found: {model_id}")))
        }
    }
}

async fn load_request_extension<M, Id, Fut>(
    mut request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Id,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    Id: Display,
    Fut: Future<Output = Result<Option<M>, DbErr>>,
{
    let model = fetch_model_or_error(model_name, model_id, load_future).await?;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

/// Loads the `{task_id}` path segment into a [`Task`] request extension.
/// A segment that is not an integer id is a 400.
pub async fn load_task_middleware(
    State(deployment): State<DeploymentImpl>,
    task_id: Result<Path<i64>, PathRejection>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Path(task_id) = task_id?;
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_id(&deployment.db().pool, task_id),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_failure_surfaces_as_database_error() {
        let result: Result<Task, ApiError> = fetch_model_or_error("Task", 3, async {
            Err(DbErr::Custom("database is locked".to_string()))
        })
        .await;

        assert!(matches!(
            result,
            Err(ApiError::Database(DbErr::Custom(msg))) if msg == "database is locked"
        ));
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let result: Result<Task, ApiError> =
            fetch_model_or_error("Task", 3, async { Ok(None) }).await;

        assert!(matches!(result, Err(ApiError::NotFound(msg)) if msg == "Task not found: 3"));
    }
}
