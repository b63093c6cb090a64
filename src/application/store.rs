use crate::application::bootstrap::{BootstrapLoader, prepare_workspace};
use crate::application::integration::{IntegrationSessionManager, IntegrationSnapshot};
use crate::domain::models::{
    IntegrationSession, Note, PROJECT_COLOR_PALETTE, Project, Task, TaskCategory, TaskDraft,
    TaskPatch, Theme, UserProfile,
};
use crate::domain::project_mapping::{self, ProjectMapping};
use crate::infrastructure::config::load_service_config;
use crate::infrastructure::error::CoreError;
use crate::infrastructure::integration_client::{IntegrationClient, ReqwestIntegrationClient};
use crate::infrastructure::logging::CoreLogger;
use crate::infrastructure::snapshot_store::{SnapshotStore, SqliteSnapshotStore};
use crate::infrastructure::snapshots::SnapshotAdapter;
use crate::infrastructure::task_client::{
    RemoteTaskCreate, RemoteTaskPatch, ReqwestTaskClient, TaskClient,
};
use chrono::{Duration, NaiveDate, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A habit materializes as one independent task per day for three weeks.
const HABIT_SERIES_DAYS: i64 = 21;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_id(prefix: &str) -> String {
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Default)]
struct RuntimeState {
    user: Option<UserProfile>,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    notes: Vec<Note>,
    theme: Theme,
    loading: bool,
    next_project_index: u64,
}

/// Point-in-time copy of the runtime state, cheap enough to hand to a UI layer.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub user: Option<UserProfile>,
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub notes: Vec<Note>,
    pub theme: Theme,
    pub loading: bool,
}

/// The application core: owns the in-memory working set, the snapshot
/// adapter, the remote task client and the integration session. Mutations
/// apply locally first; remote confirmation happens after, and a failed
/// confirmation triggers a full reload from the service.
pub struct AppCore<S, T, I>
where
    S: SnapshotStore,
    T: TaskClient,
    I: IntegrationClient,
{
    state: Mutex<RuntimeState>,
    snapshots: Arc<SnapshotAdapter<S>>,
    task_client: Arc<T>,
    integration: IntegrationSessionManager<S, I>,
    logger: Arc<CoreLogger>,
}

pub type App = AppCore<SqliteSnapshotStore, ReqwestTaskClient, ReqwestIntegrationClient>;

impl App {
    /// Production constructor: prepares the workspace directory layout,
    /// reads `services.json` and wires the SQLite-backed store plus the two
    /// HTTP clients.
    pub fn open(workspace_root: &Path) -> Result<Self, CoreError> {
        let layout = prepare_workspace(workspace_root)?;
        let config = load_service_config(&layout.config_dir)?;
        let logger = Arc::new(CoreLogger::new(layout.logs_dir));
        let store = Arc::new(SqliteSnapshotStore::new(&layout.database_path));
        Ok(Self::assemble(
            store,
            Arc::new(ReqwestTaskClient::new(config.task_service_base_url)),
            Arc::new(ReqwestIntegrationClient::new(config.integration_base_url)),
            logger,
        ))
    }
}

impl<S, T, I> AppCore<S, T, I>
where
    S: SnapshotStore,
    T: TaskClient,
    I: IntegrationClient,
{
    pub fn with_components(store: Arc<S>, task_client: Arc<T>, integration_client: Arc<I>) -> Self {
        Self::assemble(
            store,
            task_client,
            integration_client,
            Arc::new(CoreLogger::disabled()),
        )
    }

    fn assemble(
        store: Arc<S>,
        task_client: Arc<T>,
        integration_client: Arc<I>,
        logger: Arc<CoreLogger>,
    ) -> Self {
        let snapshots = Arc::new(SnapshotAdapter::new(store));
        let integration = IntegrationSessionManager::new(
            Arc::clone(&snapshots),
            integration_client,
            Arc::clone(&logger),
        );
        Self {
            state: Mutex::new(RuntimeState {
                loading: true,
                next_project_index: 1,
                ..RuntimeState::default()
            }),
            snapshots,
            task_client,
            integration,
            logger,
        }
    }

    /// Loads everything persisted, fetches the remote task list (falling back
    /// to the cached copy when the service is unreachable) and reattaches a
    /// stored integration session if one exists.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let loader = BootstrapLoader::new(Arc::clone(&self.snapshots), Arc::clone(&self.task_client));
        let initial = loader.run().await;
        for warning in &initial.warnings {
            self.logger.error("initialize", warning);
        }
        if initial.used_fallback {
            self.logger
                .info("initialize", "task service unreachable, serving cached tasks");
        }

        {
            let mut state = self.lock_state()?;
            state.next_project_index = next_project_index(&initial.projects);
            state.user = initial.user;
            state.notes = initial.notes;
            state.theme = initial.theme;
            state.projects = initial.projects;
            state.tasks = initial.tasks;
            state.loading = false;
        }

        if let Some(session) = initial.session {
            if let Err(error) = self.integration.restore(session).await {
                self.logger.error("initialize", &error.to_string());
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Result<StateSnapshot, CoreError> {
        let state = self.lock_state()?;
        Ok(StateSnapshot {
            user: state.user.clone(),
            tasks: state.tasks.clone(),
            projects: state.projects.clone(),
            notes: state.notes.clone(),
            theme: state.theme,
            loading: state.loading,
        })
    }

    /// Creates a task through the remote service. A habit draft expands into
    /// one task per day for [`HABIT_SERIES_DAYS`] consecutive days. Tasks the
    /// service rejects are logged and skipped; the rest still land.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Vec<Task>, CoreError> {
        draft.validate().map_err(CoreError::InvalidInput)?;

        let deadlines: Vec<_> = if draft.category == TaskCategory::Habit {
            (0..HABIT_SERIES_DAYS)
                .map(|offset| draft.deadline + Duration::days(offset))
                .collect()
        } else {
            vec![draft.deadline]
        };

        let mut created = Vec::new();
        for deadline in deadlines {
            let mut request = RemoteTaskCreate::from_draft(&draft);
            request.deadline = deadline;
            match self.task_client.create(&request).await {
                Ok(remote) => created.push(remote.into_task(draft.project_id.clone())),
                Err(error) => self.logger.error("create_task", &error.to_string()),
            }
        }

        {
            let mut state = self.lock_state()?;
            state.tasks.extend(created.iter().cloned());
        }
        self.persist_tasks().await;
        Ok(created)
    }

    /// Applies the patch to the in-memory task before any network round trip,
    /// then confirms with the service. A rejected confirmation falls back to
    /// a full reload so the local copy converges on what the service holds.
    /// Patches that only touch the project assignment never leave the client.
    pub async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<(), CoreError> {
        let known = {
            let mut state = self.lock_state()?;
            match state.tasks.iter_mut().find(|task| task.id == task_id) {
                Some(task) => {
                    task.apply_patch(&patch);
                    true
                }
                None => false,
            }
        };
        if !known {
            self.logger
                .error("update_task", &format!("unknown task {task_id}"));
            return Ok(());
        }
        self.persist_tasks().await;

        if !patch.is_client_only() {
            let request = RemoteTaskPatch::from_patch(&patch);
            if let Err(error) = self.task_client.update(task_id, &request).await {
                self.logger.error("update_task", &error.to_string());
                self.resync().await;
                self.persist_tasks().await;
            }
        }
        Ok(())
    }

    pub async fn complete_task(&self, task_id: &str, completed: bool) -> Result<(), CoreError> {
        self.update_task(task_id, TaskPatch::completed(completed))
            .await
    }

    /// Removes the task locally, then confirms the deletion with the service.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), CoreError> {
        let known = {
            let mut state = self.lock_state()?;
            let before = state.tasks.len();
            state.tasks.retain(|task| task.id != task_id);
            state.tasks.len() != before
        };
        if !known {
            self.logger
                .error("delete_task", &format!("unknown task {task_id}"));
            return Ok(());
        }
        self.persist_tasks().await;

        if let Err(error) = self.task_client.delete(task_id).await {
            self.logger.error("delete_task", &error.to_string());
            self.resync().await;
            self.persist_tasks().await;
        }
        Ok(())
    }

    pub async fn add_project(&self, name: &str) -> Result<Project, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("project.name is empty".to_string()));
        }
        let project = {
            let mut state = self.lock_state()?;
            let index = state.next_project_index;
            state.next_project_index += 1;
            let project = Project {
                id: format!("P{index}"),
                name: name.trim().to_string(),
                color: PROJECT_COLOR_PALETTE[(index as usize - 1) % PROJECT_COLOR_PALETTE.len()]
                    .to_string(),
            };
            state.projects.push(project.clone());
            project
        };
        self.persist_projects().await;
        Ok(project)
    }

    pub async fn rename_project(&self, project_id: &str, name: &str) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("project.name is empty".to_string()));
        }
        {
            let mut state = self.lock_state()?;
            let Some(project) = state
                .projects
                .iter_mut()
                .find(|project| project.id == project_id)
            else {
                return Err(CoreError::InvalidInput(format!(
                    "unknown project {project_id}"
                )));
            };
            project.name = name.trim().to_string();
        }
        self.persist_projects().await;
        Ok(())
    }

    /// Deletes the project and every task assigned to it. Each member task
    /// goes through the normal delete path so the service hears about it too.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), CoreError> {
        let member_ids: Vec<String> = {
            let state = self.lock_state()?;
            state
                .tasks
                .iter()
                .filter(|task| task.project_id.as_deref() == Some(project_id))
                .map(|task| task.id.clone())
                .collect()
        };
        for task_id in member_ids {
            self.delete_task(&task_id).await?;
        }
        {
            let mut state = self.lock_state()?;
            state.projects.retain(|project| project.id != project_id);
        }
        self.persist_projects().await;
        Ok(())
    }

    pub async fn add_note(&self, date: NaiveDate, content: &str) -> Result<Note, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::InvalidInput("note.content is empty".to_string()));
        }
        let note = Note {
            id: next_id("N"),
            date,
            content: content.to_string(),
        };
        {
            let mut state = self.lock_state()?;
            state.notes.push(note.clone());
        }
        self.persist_notes().await;
        Ok(note)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), CoreError> {
        self.lock_state()?.theme = theme;
        if let Err(error) = self.snapshots.save_theme(theme).await {
            self.logger.error("set_theme", &error.to_string());
        }
        Ok(())
    }

    pub async fn login(&self, email: &str, _password: &str) -> Result<bool, CoreError> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(false);
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        let user = UserProfile {
            id: next_id("U"),
            name,
            email: email.to_string(),
        };
        if let Err(error) = self.snapshots.save_user(&user).await {
            self.logger.error("login", &error.to_string());
        }
        self.lock_state()?.user = Some(user);
        Ok(true)
    }

    pub async fn signup(&self, name: &str, email: &str, _password: &str) -> Result<bool, CoreError> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Ok(false);
        }
        let user = UserProfile {
            id: next_id("U"),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
        };
        if let Err(error) = self.snapshots.save_user(&user).await {
            self.logger.error("signup", &error.to_string());
        }
        self.lock_state()?.user = Some(user);
        Ok(true)
    }

    /// Drops the in-memory working set and every persisted snapshot, and
    /// severs the integration session.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.integration.disconnect().await?;
        if let Err(error) = self.snapshots.clear_all().await {
            self.logger.error("logout", &error.to_string());
        }
        let mut state = self.lock_state()?;
        state.user = None;
        state.tasks.clear();
        state.projects.clear();
        state.notes.clear();
        state.theme = Theme::default();
        state.next_project_index = 1;
        Ok(())
    }

    pub async fn connect_integration(&self, session: IntegrationSession) -> Result<bool, CoreError> {
        self.integration.connect(session).await
    }

    pub async fn disconnect_integration(&self) -> Result<(), CoreError> {
        self.integration.disconnect().await
    }

    pub async fn refresh_integration(&self) -> Result<(), CoreError> {
        self.integration.refresh().await
    }

    pub fn integration_snapshot(&self) -> Result<IntegrationSnapshot, CoreError> {
        self.integration.snapshot()
    }

    /// Full reload: the service's task list wins, with client-side project
    /// assignments reattached from the persisted mapping.
    async fn resync(&self) {
        let remote = match self.task_client.list().await {
            Ok(remote) => remote,
            Err(error) => {
                self.logger.error("resync", &error.to_string());
                return;
            }
        };
        let mapping = match self.snapshots.load_project_mapping().await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => ProjectMapping::new(),
            Err(error) => {
                self.logger.error("resync", &error.to_string());
                ProjectMapping::new()
            }
        };
        let tasks = project_mapping::merge(
            remote.into_iter().map(|task| task.into_task(None)).collect(),
            &mapping,
        );
        match self.lock_state() {
            Ok(mut state) => state.tasks = tasks,
            Err(error) => self.logger.error("resync", &error.to_string()),
        }
    }

    async fn persist_tasks(&self) {
        let (tasks, mapping) = match self.lock_state() {
            Ok(state) => (state.tasks.clone(), project_mapping::derive(&state.tasks)),
            Err(error) => {
                self.logger.error("persist_tasks", &error.to_string());
                return;
            }
        };
        if let Err(error) = self.snapshots.save_project_mapping(&mapping).await {
            self.logger.error("persist_tasks", &error.to_string());
        }
        if let Err(error) = self.snapshots.save_task_fallback(&tasks).await {
            self.logger.error("persist_tasks", &error.to_string());
        }
    }

    async fn persist_projects(&self) {
        let projects = match self.lock_state() {
            Ok(state) => state.projects.clone(),
            Err(error) => {
                self.logger.error("persist_projects", &error.to_string());
                return;
            }
        };
        if let Err(error) = self.snapshots.save_projects(&projects).await {
            self.logger.error("persist_projects", &error.to_string());
        }
    }

    async fn persist_notes(&self) {
        let notes = match self.lock_state() {
            Ok(state) => state.notes.clone(),
            Err(error) => {
                self.logger.error("persist_notes", &error.to_string());
                return;
            }
        };
        if let Err(error) = self.snapshots.save_notes(&notes).await {
            self.logger.error("persist_notes", &error.to_string());
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, RuntimeState>, CoreError> {
        self.state
            .lock()
            .map_err(|error| CoreError::Storage(format!("runtime state lock poisoned: {error}")))
    }
}

fn next_project_index(projects: &[Project]) -> u64 {
    projects
        .iter()
        .filter_map(|project| project.id.strip_prefix('P'))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::integration_client::{CalendarEvent, InboxMessage};
    use crate::infrastructure::snapshot_store::InMemorySnapshotStore;
    use crate::infrastructure::task_client::RemoteTask;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Notify;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid")
    }

    fn sample_remote(id: &str, title: &str) -> RemoteTask {
        RemoteTask {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            deadline: fixed_time(),
            priority: crate::domain::models::TaskPriority::Medium,
            category: TaskCategory::Task,
            completed: false,
            created_at: fixed_time(),
        }
    }

    fn sample_draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: None,
            deadline: fixed_time(),
            category: TaskCategory::Task,
            priority: crate::domain::models::TaskPriority::Medium,
            project_id: None,
        }
    }

    #[derive(Default)]
    struct FakeTaskClient {
        tasks: Mutex<Vec<RemoteTask>>,
        fail_create: bool,
        fail_update: bool,
        fail_delete: bool,
        fail_list: bool,
        update_gate: Option<Arc<Notify>>,
        update_started: Arc<AtomicBool>,
        create_calls: AtomicUsize,
        id_sequence: AtomicUsize,
    }

    impl FakeTaskClient {
        fn seeded(tasks: Vec<RemoteTask>) -> Self {
            Self {
                tasks: Mutex::new(tasks),
                ..Self::default()
            }
        }

        fn stored(&self) -> Vec<RemoteTask> {
            self.tasks.lock().expect("fake lock").clone()
        }
    }

    #[async_trait]
    impl TaskClient for FakeTaskClient {
        async fn list(&self) -> Result<Vec<RemoteTask>, CoreError> {
            if self.fail_list {
                return Err(CoreError::Transport("list unavailable".to_string()));
            }
            Ok(self.stored())
        }

        async fn create(&self, request: &RemoteTaskCreate) -> Result<RemoteTask, CoreError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(CoreError::Transport("create unavailable".to_string()));
            }
            let id = self.id_sequence.fetch_add(1, Ordering::SeqCst);
            let remote = RemoteTask {
                id: format!("T{id}"),
                title: request.title.clone(),
                description: request.description.clone(),
                deadline: request.deadline,
                priority: request.priority,
                category: request.category,
                completed: request.completed,
                created_at: fixed_time(),
            };
            self.tasks.lock().expect("fake lock").push(remote.clone());
            Ok(remote)
        }

        async fn update(&self, task_id: &str, request: &RemoteTaskPatch) -> Result<(), CoreError> {
            self.update_started.store(true, Ordering::SeqCst);
            if let Some(gate) = &self.update_gate {
                gate.notified().await;
            }
            if self.fail_update {
                return Err(CoreError::Transport("update unavailable".to_string()));
            }
            let mut tasks = self.tasks.lock().expect("fake lock");
            if let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) {
                if let Some(title) = &request.title {
                    task.title = title.clone();
                }
                if let Some(completed) = request.completed {
                    task.completed = completed;
                }
            }
            Ok(())
        }

        async fn delete(&self, task_id: &str) -> Result<(), CoreError> {
            if self.fail_delete {
                return Err(CoreError::Transport("delete unavailable".to_string()));
            }
            self.tasks
                .lock()
                .expect("fake lock")
                .retain(|task| task.id != task_id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct IdleIntegrationClient;

    #[async_trait]
    impl IntegrationClient for IdleIntegrationClient {
        async fn fetch_calendar_events(
            &self,
            _access_token: &str,
        ) -> Result<Vec<CalendarEvent>, CoreError> {
            Ok(Vec::new())
        }

        async fn fetch_inbox_messages(
            &self,
            _access_token: &str,
        ) -> Result<Vec<InboxMessage>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn core_with(
        client: Arc<FakeTaskClient>,
    ) -> AppCore<InMemorySnapshotStore, FakeTaskClient, IdleIntegrationClient> {
        AppCore::with_components(
            Arc::new(InMemorySnapshotStore::default()),
            client,
            Arc::new(IdleIntegrationClient),
        )
    }

    fn core_on(
        store: Arc<InMemorySnapshotStore>,
        client: Arc<FakeTaskClient>,
    ) -> AppCore<InMemorySnapshotStore, FakeTaskClient, IdleIntegrationClient> {
        AppCore::with_components(store, client, Arc::new(IdleIntegrationClient))
    }

    #[tokio::test]
    async fn initialize_adopts_remote_tasks_and_clears_loading() {
        let client = Arc::new(FakeTaskClient::seeded(vec![sample_remote("T1", "Read")]));
        let core = core_with(client);

        core.initialize().await.expect("initialize");
        let snapshot = core.snapshot().expect("snapshot");
        assert!(!snapshot.loading);
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].id, "T1");
    }

    #[tokio::test]
    async fn create_task_lands_locally_and_remotely() {
        let client = Arc::new(FakeTaskClient::default());
        let core = core_with(Arc::clone(&client));

        let created = core.create_task(sample_draft("Write essay")).await.expect("create");
        assert_eq!(created.len(), 1);
        assert_eq!(core.snapshot().expect("snapshot").tasks.len(), 1);
        assert_eq!(client.stored().len(), 1);
    }

    #[tokio::test]
    async fn create_task_rejects_blank_title() {
        let core = core_with(Arc::new(FakeTaskClient::default()));
        let result = core.create_task(sample_draft("   ")).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn failed_create_is_not_added_locally() {
        let client = Arc::new(FakeTaskClient {
            fail_create: true,
            ..FakeTaskClient::default()
        });
        let core = core_with(Arc::clone(&client));

        let created = core.create_task(sample_draft("Unreachable")).await.expect("create");
        assert!(created.is_empty());
        assert!(core.snapshot().expect("snapshot").tasks.is_empty());
    }

    // Habit drafts expand into one task per day for three consecutive weeks.
    #[tokio::test]
    async fn habit_draft_expands_into_daily_series() {
        let client = Arc::new(FakeTaskClient::default());
        let core = core_with(Arc::clone(&client));

        let mut draft = sample_draft("Morning run");
        draft.category = TaskCategory::Habit;
        let created = core.create_task(draft).await.expect("create");

        assert_eq!(created.len(), 21);
        assert_eq!(client.create_calls.load(Ordering::SeqCst), 21);
        let deadlines: HashSet<_> = created.iter().map(|task| task.deadline).collect();
        assert_eq!(deadlines.len(), 21);
        for (offset, task) in created.iter().enumerate() {
            assert_eq!(task.deadline, fixed_time() + Duration::days(offset as i64));
            assert_eq!(task.title, "Morning run");
        }
    }

    // The patched value must be observable before the remote confirmation
    // resolves: the fake's update call parks on a gate while we look.
    #[tokio::test]
    async fn update_is_visible_before_remote_confirmation() {
        let gate = Arc::new(Notify::new());
        let started = Arc::new(AtomicBool::new(false));
        let client = Arc::new(FakeTaskClient {
            tasks: Mutex::new(vec![sample_remote("T1", "Draft title")]),
            update_gate: Some(Arc::clone(&gate)),
            update_started: Arc::clone(&started),
            ..FakeTaskClient::default()
        });
        let core = Arc::new(core_with(Arc::clone(&client)));
        core.initialize().await.expect("initialize");

        let worker = Arc::clone(&core);
        let handle = tokio::spawn(async move {
            let mut patch = TaskPatch::default();
            patch.title = Some("Final title".to_string());
            worker.update_task("T1", patch).await
        });

        while !started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let snapshot = core.snapshot().expect("snapshot");
        assert_eq!(snapshot.tasks[0].title, "Final title");

        gate.notify_one();
        handle.await.expect("join").expect("update");
        assert_eq!(client.stored()[0].title, "Final title");
    }

    // A confirmation the service rejects triggers a full reload, so the
    // local copy converges on the service's value.
    #[tokio::test]
    async fn failed_update_converges_on_remote_state() {
        let client = Arc::new(FakeTaskClient {
            tasks: Mutex::new(vec![sample_remote("T1", "Authoritative")]),
            fail_update: true,
            ..FakeTaskClient::default()
        });
        let core = core_with(Arc::clone(&client));
        core.initialize().await.expect("initialize");

        let mut patch = TaskPatch::default();
        patch.title = Some("Rejected".to_string());
        core.update_task("T1", patch).await.expect("update");

        let snapshot = core.snapshot().expect("snapshot");
        assert_eq!(snapshot.tasks[0].title, "Authoritative");
    }

    #[tokio::test]
    async fn failed_delete_restores_the_task_from_remote() {
        let client = Arc::new(FakeTaskClient {
            tasks: Mutex::new(vec![sample_remote("T1", "Sticky")]),
            fail_delete: true,
            ..FakeTaskClient::default()
        });
        let core = core_with(Arc::clone(&client));
        core.initialize().await.expect("initialize");

        core.delete_task("T1").await.expect("delete");
        let snapshot = core.snapshot().expect("snapshot");
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].id, "T1");
    }

    #[tokio::test]
    async fn unknown_task_update_is_ignored() {
        let core = core_with(Arc::new(FakeTaskClient::default()));
        core.update_task("ghost", TaskPatch::completed(true))
            .await
            .expect("update");
        assert!(core.snapshot().expect("snapshot").tasks.is_empty());
    }

    #[tokio::test]
    async fn project_assignment_never_reaches_the_service() {
        let gate_free_client = Arc::new(FakeTaskClient {
            tasks: Mutex::new(vec![sample_remote("T1", "Read")]),
            fail_update: true,
            ..FakeTaskClient::default()
        });
        let core = core_with(Arc::clone(&gate_free_client));
        core.initialize().await.expect("initialize");
        core.add_project("Uni").await.expect("add project");

        let mut patch = TaskPatch::default();
        patch.project_id = Some(Some("P1".to_string()));
        core.update_task("T1", patch).await.expect("update");

        // fail_update would have forced a resync if the call had gone out.
        let snapshot = core.snapshot().expect("snapshot");
        assert_eq!(snapshot.tasks[0].project_id.as_deref(), Some("P1"));
    }

    #[tokio::test]
    async fn first_project_gets_first_palette_color() {
        let core = core_with(Arc::new(FakeTaskClient::default()));
        let project = core.add_project("Uni").await.expect("add project");
        assert_eq!(project.id, "P1");
        assert_eq!(project.color, PROJECT_COLOR_PALETTE[0]);

        let second = core.add_project("Home").await.expect("add project");
        assert_eq!(second.id, "P2");
        assert_eq!(second.color, PROJECT_COLOR_PALETTE[1]);
    }

    // Assignments live only in the mapping snapshot; a fresh core fed the
    // same bare remote list must reattach them.
    #[tokio::test]
    async fn project_assignments_survive_a_fresh_bootstrap() {
        let store = Arc::new(InMemorySnapshotStore::default());
        let client = Arc::new(FakeTaskClient::seeded(vec![sample_remote("T1", "Read")]));

        let core = core_on(Arc::clone(&store), Arc::clone(&client));
        core.initialize().await.expect("initialize");
        core.add_project("Uni").await.expect("add project");
        let mut patch = TaskPatch::default();
        patch.project_id = Some(Some("P1".to_string()));
        core.update_task("T1", patch).await.expect("update");

        let reborn = core_on(store, client);
        reborn.initialize().await.expect("re-initialize");
        let snapshot = reborn.snapshot().expect("snapshot");
        assert_eq!(snapshot.tasks[0].project_id.as_deref(), Some("P1"));
        assert_eq!(snapshot.projects.len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_project_cascades_to_its_tasks() {
        let client = Arc::new(FakeTaskClient::seeded(vec![
            sample_remote("T1", "In project"),
            sample_remote("T2", "Elsewhere"),
        ]));
        let core = core_with(Arc::clone(&client));
        core.initialize().await.expect("initialize");
        core.add_project("Uni").await.expect("add project");

        let mut patch = TaskPatch::default();
        patch.project_id = Some(Some("P1".to_string()));
        core.update_task("T1", patch).await.expect("assign");

        core.delete_project("P1").await.expect("delete project");

        let snapshot = core.snapshot().expect("snapshot");
        assert!(snapshot.projects.is_empty());
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.tasks[0].id, "T2");
        // the cascade used the remote delete path
        assert_eq!(client.stored().len(), 1);
        assert_eq!(client.stored()[0].id, "T2");
    }

    #[tokio::test]
    async fn project_ids_continue_past_persisted_ones() {
        let store = Arc::new(InMemorySnapshotStore::default());
        let client = Arc::new(FakeTaskClient::default());

        let core = core_on(Arc::clone(&store), Arc::clone(&client));
        core.initialize().await.expect("initialize");
        core.add_project("One").await.expect("add");
        core.add_project("Two").await.expect("add");

        let reborn = core_on(store, client);
        reborn.initialize().await.expect("re-initialize");
        let third = reborn.add_project("Three").await.expect("add");
        assert_eq!(third.id, "P3");
    }

    #[tokio::test]
    async fn logout_clears_state_and_snapshots() {
        let store = Arc::new(InMemorySnapshotStore::default());
        let client = Arc::new(FakeTaskClient::seeded(vec![sample_remote("T1", "Read")]));
        let core = core_on(Arc::clone(&store), client);

        core.initialize().await.expect("initialize");
        assert!(core.login("sam@example.com", "pw").await.expect("login"));
        core.add_project("Uni").await.expect("add project");
        core.logout().await.expect("logout");

        let snapshot = core.snapshot().expect("snapshot");
        assert!(snapshot.user.is_none());
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.projects.is_empty());

        let adapter = SnapshotAdapter::new(store);
        assert!(adapter.load_user().await.expect("load").is_none());
        assert!(adapter.load_projects().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn notes_and_theme_round_trip_through_snapshots() {
        let store = Arc::new(InMemorySnapshotStore::default());
        let client = Arc::new(FakeTaskClient::default());
        let core = core_on(Arc::clone(&store), Arc::clone(&client));
        core.initialize().await.expect("initialize");

        let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
        core.add_note(date, "Revise chapter 4").await.expect("add note");
        core.set_theme(Theme::Dark).await.expect("set theme");

        let reborn = core_on(store, client);
        reborn.initialize().await.expect("re-initialize");
        let snapshot = reborn.snapshot().expect("snapshot");
        assert_eq!(snapshot.notes.len(), 1);
        assert_eq!(snapshot.notes[0].content, "Revise chapter 4");
        assert_eq!(snapshot.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn login_rejects_blank_email() {
        let core = core_with(Arc::new(FakeTaskClient::default()));
        assert!(!core.login("   ", "pw").await.expect("login"));
        assert!(core.snapshot().expect("snapshot").user.is_none());
    }
}
