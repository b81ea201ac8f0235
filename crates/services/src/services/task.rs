use db::{
    DbErr, DbPool, TransactionTrait,
    models::task::{CreateTask, DeleteTaskResponse, Task, TaskStatus, UpdateTask},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found: {0}")]
    TaskNotFound(i64),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, TaskServiceError>;

/// Validated CRUD over the task table. Failures are returned to the caller
/// as-is; nothing here retries or recovers.
#[derive(Clone, Default)]
pub struct TaskService;

impl TaskService {
    pub fn new() -> Self {
        Self
    }

    fn normalize_title(title: &str) -> Result<String> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(TaskServiceError::ValidationError(
                "Title must not be empty".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }

    pub async fn create_task(&self, pool: &DbPool, payload: CreateTask) -> Result<Task> {
        let payload = CreateTask {
            title: Self::normalize_title(&payload.title)?,
            ..payload
        };

        let task = Task::create(pool, &payload).await?;
        tracing::info!(task_id = task.id, status = %task.status, "Created task");
        Ok(task)
    }

    pub async fn list_tasks(&self, pool: &DbPool, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        Ok(Task::find_all(pool, status).await?)
    }

    pub async fn get_task(&self, pool: &DbPool, id: i64) -> Result<Task> {
        Task::find_by_id(pool, id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Applies a partial update. Always bumps `updated_at`, including when
    /// `payload` carries no fields at all.
    pub async fn update_task(&self, pool: &DbPool, id: i64, payload: UpdateTask) -> Result<Task> {
        let payload = match payload.title.as_deref() {
            Some(title) => UpdateTask {
                title: Some(Self::normalize_title(title)?),
                ..payload
            },
            None => payload,
        };

        let tx = pool.begin().await?;
        let Some(task) = Task::update(&tx, id, &payload).await? else {
            tx.rollback().await?;
            return Err(TaskServiceError::TaskNotFound(id));
        };
        tx.commit().await?;

        if payload.is_empty() {
            tracing::debug!(task_id = id, "Touched task without field changes");
        } else {
            tracing::info!(task_id = id, status = %task.status, "Updated task");
        }
        Ok(task)
    }

    pub async fn delete_task(&self, pool: &DbPool, id: i64) -> Result<DeleteTaskResponse> {
        let rows = Task::delete(pool, id).await?;
        if rows == 0 {
            return Err(TaskServiceError::TaskNotFound(id));
        }

        tracing::info!(task_id = id, "Deleted task");
        Ok(DeleteTaskResponse { success: true, id })
    }
}
