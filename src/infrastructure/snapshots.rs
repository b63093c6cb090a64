use crate::domain::models::{IntegrationSession, Note, Project, Task, Theme, UserProfile};
use crate::domain::project_mapping::ProjectMapping;
use crate::infrastructure::error::CoreError;
use crate::infrastructure::snapshot_store::SnapshotStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const KEY_USER: &str = "focusflow-user";
pub const KEY_NOTES: &str = "focusflow-notes";
pub const KEY_THEME: &str = "focusflow-theme";
pub const KEY_PROJECTS: &str = "focusflow-projects";
pub const KEY_TASK_FALLBACK: &str = "focusflow-tasks-fallback";
pub const KEY_PROJECT_MAPPING: &str = "focusflow-project-mapping";
pub const KEY_INTEGRATION_TOKEN: &str = "focusflow-google-token";

pub const MANAGED_KEYS: [&str; 7] = [
    KEY_USER,
    KEY_NOTES,
    KEY_THEME,
    KEY_PROJECTS,
    KEY_TASK_FALLBACK,
    KEY_PROJECT_MAPPING,
    KEY_INTEGRATION_TOKEN,
];

/// Typed read/write wrapper over the durable store for each managed key.
/// A missing key loads as `None`; store failures propagate to the caller.
#[derive(Debug)]
pub struct SnapshotAdapter<S: SnapshotStore> {
    store: Arc<S>,
}

impl<S: SnapshotStore> SnapshotAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        let Some(payload) = self.store.load(key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    async fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        let payload = serde_json::to_string(value)?;
        self.store.save(key, &payload).await
    }

    pub async fn load_user(&self) -> Result<Option<UserProfile>, CoreError> {
        self.load_json(KEY_USER).await
    }

    pub async fn save_user(&self, user: &UserProfile) -> Result<(), CoreError> {
        self.save_json(KEY_USER, user).await
    }

    pub async fn remove_user(&self) -> Result<(), CoreError> {
        self.store.remove(KEY_USER).await
    }

    pub async fn load_notes(&self) -> Result<Option<Vec<Note>>, CoreError> {
        self.load_json(KEY_NOTES).await
    }

    pub async fn save_notes(&self, notes: &[Note]) -> Result<(), CoreError> {
        self.save_json(KEY_NOTES, &notes).await
    }

    pub async fn load_theme(&self) -> Result<Option<Theme>, CoreError> {
        self.load_json(KEY_THEME).await
    }

    pub async fn save_theme(&self, theme: Theme) -> Result<(), CoreError> {
        self.save_json(KEY_THEME, &theme).await
    }

    pub async fn load_projects(&self) -> Result<Option<Vec<Project>>, CoreError> {
        self.load_json(KEY_PROJECTS).await
    }

    pub async fn save_projects(&self, projects: &[Project]) -> Result<(), CoreError> {
        self.save_json(KEY_PROJECTS, &projects).await
    }

    pub async fn load_task_fallback(&self) -> Result<Option<Vec<Task>>, CoreError> {
        self.load_json(KEY_TASK_FALLBACK).await
    }

    pub async fn save_task_fallback(&self, tasks: &[Task]) -> Result<(), CoreError> {
        self.save_json(KEY_TASK_FALLBACK, &tasks).await
    }

    pub async fn load_project_mapping(&self) -> Result<Option<ProjectMapping>, CoreError> {
        self.load_json(KEY_PROJECT_MAPPING).await
    }

    pub async fn save_project_mapping(&self, mapping: &ProjectMapping) -> Result<(), CoreError> {
        self.save_json(KEY_PROJECT_MAPPING, mapping).await
    }

    pub async fn load_session(&self) -> Result<Option<IntegrationSession>, CoreError> {
        self.load_json(KEY_INTEGRATION_TOKEN).await
    }

    pub async fn save_session(&self, session: &IntegrationSession) -> Result<(), CoreError> {
        self.save_json(KEY_INTEGRATION_TOKEN, session).await
    }

    pub async fn remove_session(&self) -> Result<(), CoreError> {
        self.store.remove(KEY_INTEGRATION_TOKEN).await
    }

    pub async fn clear_all(&self) -> Result<(), CoreError> {
        self.store.remove_many(&MANAGED_KEYS).await
    }
}
