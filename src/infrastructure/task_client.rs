use crate::domain::models::{Task, TaskCategory, TaskDraft, TaskPatch, TaskPriority};
use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use url::Url;

/// Wire shape of a task as the remote service returns it. It has no notion of
/// `project_id`; that attribute is reunited client-side from the mapping.
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct RemoteTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl RemoteTask {
    pub fn into_task(self, project_id: Option<String>) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            category: self.category,
            priority: self.priority,
            completed: self.completed,
            created_at: self.created_at,
            project_id,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct RemoteTaskCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: TaskPriority,
    pub category: TaskCategory,
    pub completed: bool,
}

impl RemoteTaskCreate {
    /// Builds the create payload from a draft, stripping the client-only
    /// project assignment.
    pub fn from_draft(draft: &TaskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            deadline: draft.deadline,
            priority: draft.priority,
            category: draft.category,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, PartialEq, Eq)]
pub struct RemoteTaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    // Doubly optional: `Some(None)` sends an explicit null to clear the
    // description on the service, `None` leaves the field off the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl RemoteTaskPatch {
    pub fn from_patch(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            deadline: patch.deadline,
            priority: patch.priority,
            category: patch.category,
            completed: patch.completed,
        }
    }
}

#[async_trait]
pub trait TaskClient: Send + Sync {
    async fn list(&self) -> Result<Vec<RemoteTask>, CoreError>;
    async fn create(&self, request: &RemoteTaskCreate) -> Result<RemoteTask, CoreError>;
    async fn update(&self, task_id: &str, request: &RemoteTaskPatch) -> Result<(), CoreError>;
    async fn delete(&self, task_id: &str) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTaskClient {
    client: Client,
    base_url: String,
}

impl ReqwestTaskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn transport_http_error(status: reqwest::StatusCode, body: &str) -> CoreError {
        let message = if body.trim().is_empty() {
            format!("task service error: http {}", status.as_u16())
        } else {
            format!("task service error: http {}; body={body}", status.as_u16())
        };
        CoreError::Transport(message)
    }

    fn collection_endpoint(&self) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CoreError::Transport(format!("invalid task service base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CoreError::Transport("task service base URL cannot be a base".to_string())
            })?;
            segments.push("tasks");
            // Trailing slash; the service routes the collection under /tasks/.
            segments.push("");
        }
        Ok(url)
    }

    fn task_endpoint(&self, task_id: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CoreError::Transport(format!("invalid task service base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CoreError::Transport("task service base URL cannot be a base".to_string())
            })?;
            segments.push("tasks");
            segments.push(task_id);
        }
        Ok(url)
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), CoreError> {
        if value.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!("{field} must not be empty")));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskClient for ReqwestTaskClient {
    async fn list(&self) -> Result<Vec<RemoteTask>, CoreError> {
        let endpoint = self.collection_endpoint()?;
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|error| CoreError::Transport(format!("network error while listing tasks: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CoreError::Transport(format!("failed reading task list response: {error}")))?;

        if !status.is_success() {
            return Err(Self::transport_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            CoreError::Transport(format!("invalid task list payload: {error}; body={body}"))
        })
    }

    async fn create(&self, request: &RemoteTaskCreate) -> Result<RemoteTask, CoreError> {
        let endpoint = self.collection_endpoint()?;
        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|error| CoreError::Transport(format!("network error while creating task: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CoreError::Transport(format!("failed reading task create response: {error}")))?;

        if !status.is_success() {
            return Err(Self::transport_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            CoreError::Transport(format!("invalid task create payload: {error}; body={body}"))
        })
    }

    async fn update(&self, task_id: &str, request: &RemoteTaskPatch) -> Result<(), CoreError> {
        Self::ensure_non_empty(task_id, "task id")?;

        let endpoint = self.task_endpoint(task_id)?;
        let response = self
            .client
            .patch(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|error| CoreError::Transport(format!("network error while updating task: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CoreError::Transport(format!("failed reading task update response: {error}")))?;

        if !status.is_success() {
            return Err(Self::transport_http_error(status, &body));
        }
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<(), CoreError> {
        Self::ensure_non_empty(task_id, "task id")?;

        let endpoint = self.task_endpoint(task_id)?;
        let response = self
            .client
            .delete(endpoint)
            .send()
            .await
            .map_err(|error| CoreError::Transport(format!("network error while deleting task: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CoreError::Transport(format!("failed reading task delete response: {error}")))?;

        if !status.is_success() {
            return Err(Self::transport_http_error(status, &body));
        }
        Ok(())
    }
}
