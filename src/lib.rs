//! Client-side core for the FocusFlow task manager: optimistic task
//! mutations against a remote service, durable snapshots of client-only
//! state, and a Google integration session with its derived calendar and
//! inbox data.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{BootstrapLoader, InitialState, WorkspaceLayout, prepare_workspace};
pub use application::integration::{
    IntegrationSessionManager, IntegrationSnapshot, IntegrationStatus,
};
pub use application::store::{App, AppCore, StateSnapshot};
pub use domain::models::{
    IntegrationSession, Note, Project, Task, TaskCategory, TaskDraft, TaskPatch, TaskPriority,
    Theme, UserProfile,
};
pub use domain::project_mapping::ProjectMapping;
pub use infrastructure::error::CoreError;
pub use infrastructure::integration_client::{
    CalendarEvent, InboxMessage, IntegrationClient, ReqwestIntegrationClient,
};
pub use infrastructure::snapshot_store::{
    InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore,
};
pub use infrastructure::snapshots::SnapshotAdapter;
pub use infrastructure::task_client::{
    RemoteTask, RemoteTaskCreate, RemoteTaskPatch, ReqwestTaskClient, TaskClient,
};
