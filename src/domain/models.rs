use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Task,
    Assignment,
    Habit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    // Client-only; the remote task service never sees this field.
    pub project_id: Option<String>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(project_id) = &patch.project_id {
            self.project_id = project_id.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub project_id: Option<String>,
}

impl TaskDraft {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "draft.title")
    }
}

/// Partial update. `project_id` is doubly optional: `None` leaves the
/// assignment alone, `Some(None)` clears it, `Some(Some(id))` reassigns.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub completed: Option<bool>,
    pub project_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Self::default()
        }
    }

    /// True when nothing besides the client-only project assignment changes.
    pub fn is_client_only(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
    }
}

pub const PROJECT_COLOR_PALETTE: [&str; 6] = [
    "#a855f7", "#3b82f6", "#22c55e", "#f59e0b", "#ef4444", "#14b8a6",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Project {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "project.id")?;
        validate_non_empty(&self.name, "project.name")?;
        validate_non_empty(&self.color, "project.color")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrationSession {
    pub access_token: String,
    pub connected_at: DateTime<Utc>,
}

impl IntegrationSession {
    pub fn new(access_token: impl Into<String>, connected_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            connected_at,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.access_token, "session.access_token")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
