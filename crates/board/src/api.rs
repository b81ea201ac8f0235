use async_trait::async_trait;
use db::models::task::{CreateTask, DeleteTaskResponse, Task, TaskStatus, UpdateTask};
use serde::de::DeserializeOwned;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum TaskApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response ({status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("Response carried no data")]
    MissingData,
}

impl TaskApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TaskApiError::Api { status, .. } | TaskApiError::Decode { status, .. } => Some(*status),
            TaskApiError::Transport(err) => err.status().map(|status| status.as_u16()),
            TaskApiError::MissingData => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// The four task operations the board depends on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, TaskApiError>;

    async fn create_task(&self, payload: &CreateTask) -> Result<Task, TaskApiError>;

    async fn update_task(&self, id: i64, payload: &UpdateTask) -> Result<Task, TaskApiError>;

    async fn delete_task(&self, id: i64) -> Result<DeleteTaskResponse, TaskApiError>;
}

/// [`TaskApi`] over the server's `/api/tasks` routes.
#[derive(Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn tasks_url(&self) -> String {
        format!("{}/api/tasks", self.base_url)
    }

    fn task_url(&self, id: i64) -> String {
        format!("{}/api/tasks/{id}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TaskApiError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, TaskApiError> {
        let mut request = self.client.get(self.tasks_url());
        if let Some(status) = status {
            request = request.query(&[("status", status.to_string())]);
        }
        self.send(request).await
    }

    async fn create_task(&self, payload: &CreateTask) -> Result<Task, TaskApiError> {
        self.send(self.client.post(self.tasks_url()).json(payload))
            .await
    }

    async fn update_task(&self, id: i64, payload: &UpdateTask) -> Result<Task, TaskApiError> {
        self.send(self.client.put(self.task_url(id)).json(payload))
            .await
    }

    async fn delete_task(&self, id: i64) -> Result<DeleteTaskResponse, TaskApiError> {
        self.send(self.client.delete(self.task_url(id))).await
    }
}

// Error bodies that are not the JSON envelope (e.g. a proxy's HTML page)
// still surface as `Api` with the raw text.
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, TaskApiError> {
    let envelope = match serde_json::from_slice::<ApiResponse<T>>(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&status) => {
            return Err(TaskApiError::Api {
                status,
                message: String::from_utf8_lossy(body).trim().to_string(),
            });
        }
        Err(source) => return Err(TaskApiError::Decode { status, source }),
    };

    if !envelope.is_success() || !(200..300).contains(&status) {
        return Err(TaskApiError::Api {
            status,
            message: envelope.message().unwrap_or("request failed").to_string(),
        });
    }
    envelope.into_data().ok_or(TaskApiError::MissingData)
}
