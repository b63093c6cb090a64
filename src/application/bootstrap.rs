use crate::domain::models::{IntegrationSession, Note, Project, Task, Theme, UserProfile};
use crate::domain::project_mapping::{self, ProjectMapping};
use crate::infrastructure::config::ensure_default_configs;
use crate::infrastructure::error::CoreError;
use crate::infrastructure::snapshot_store::SnapshotStore;
use crate::infrastructure::snapshots::SnapshotAdapter;
use crate::infrastructure::storage::initialize_database;
use crate::infrastructure::task_client::TaskClient;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct WorkspaceLayout {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

pub fn prepare_workspace(workspace_root: &Path) -> Result<WorkspaceLayout, CoreError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("focusflow.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(WorkspaceLayout {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
    })
}

/// Everything the first load produces. `warnings` carries non-fatal failures
/// for the caller to log; bootstrap itself never fails.
#[derive(Debug)]
pub struct InitialState {
    pub user: Option<UserProfile>,
    pub notes: Vec<Note>,
    pub theme: Theme,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub mapping: ProjectMapping,
    pub session: Option<IntegrationSession>,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
}

pub struct BootstrapLoader<S, T>
where
    S: SnapshotStore,
    T: TaskClient,
{
    snapshots: Arc<SnapshotAdapter<S>>,
    task_client: Arc<T>,
}

impl<S, T> BootstrapLoader<S, T>
where
    S: SnapshotStore,
    T: TaskClient,
{
    pub fn new(snapshots: Arc<SnapshotAdapter<S>>, task_client: Arc<T>) -> Self {
        Self {
            snapshots,
            task_client,
        }
    }

    /// First-load orchestration: read every persisted snapshot, attempt the
    /// remote task fetch, merge the project mapping, degrade to the fallback
    /// snapshot when the remote store is unreachable.
    pub async fn run(&self) -> InitialState {
        let mut warnings = Vec::new();

        let (user, notes, theme, session, projects, mapping, fallback) = tokio::join!(
            self.snapshots.load_user(),
            self.snapshots.load_notes(),
            self.snapshots.load_theme(),
            self.snapshots.load_session(),
            self.snapshots.load_projects(),
            self.snapshots.load_project_mapping(),
            self.snapshots.load_task_fallback(),
        );

        // A key the store cannot produce is treated as absent; startup is
        // never blocked on the durable store.
        let user = tolerate(user, "user profile", &mut warnings).flatten();
        let notes = tolerate(notes, "notes", &mut warnings)
            .flatten()
            .unwrap_or_default();
        let theme = tolerate(theme, "theme", &mut warnings)
            .flatten()
            .unwrap_or_default();
        let session = tolerate(session, "integration session", &mut warnings).flatten();
        let projects = tolerate(projects, "projects", &mut warnings)
            .flatten()
            .unwrap_or_default();
        let mapping = tolerate(mapping, "project mapping", &mut warnings)
            .flatten()
            .unwrap_or_default();
        let fallback = tolerate(fallback, "task fallback snapshot", &mut warnings)
            .flatten()
            .unwrap_or_default();

        let (tasks, used_fallback) = match self.task_client.list().await {
            Ok(remote_tasks) => {
                let tasks = project_mapping::merge(
                    remote_tasks
                        .into_iter()
                        .map(|remote| remote.into_task(None))
                        .collect(),
                    &mapping,
                );
                if let Err(error) = self.snapshots.save_task_fallback(&tasks).await {
                    warnings.push(format!("failed to persist task fallback snapshot: {error}"));
                }
                (tasks, false)
            }
            Err(error) => {
                // The fallback snapshot already carries project_id.
                warnings.push(format!(
                    "remote task fetch failed, using fallback snapshot: {error}"
                ));
                (fallback, true)
            }
        };

        InitialState {
            user,
            notes,
            theme,
            projects,
            tasks,
            mapping,
            session,
            used_fallback,
            warnings,
        }
    }
}

fn tolerate<V>(
    result: Result<V, CoreError>,
    what: &str,
    warnings: &mut Vec<String>,
) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warnings.push(format!("failed to load {what}: {error}"));
            None
        }
    }
}
