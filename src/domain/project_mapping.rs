use crate::domain::models::Task;
use std::collections::HashMap;

/// The remote task service is blind to `project_id`; this side-table is the
/// only channel through which the assignment survives a remote refetch.
pub type ProjectMapping = HashMap<String, String>;

/// Attaches `project_id` to freshly fetched tasks by id lookup. Tasks the
/// mapping does not know keep `None`.
pub fn merge(tasks: Vec<Task>, mapping: &ProjectMapping) -> Vec<Task> {
    tasks
        .into_iter()
        .map(|mut task| {
            task.project_id = mapping.get(&task.id).cloned();
            task
        })
        .collect()
}

/// Rebuilds the persisted mapping from current task state, keeping only
/// non-null assignments.
pub fn derive(tasks: &[Task]) -> ProjectMapping {
    tasks
        .iter()
        .filter_map(|task| {
            task.project_id
                .as_ref()
                .map(|project_id| (task.id.clone(), project_id.clone()))
        })
        .collect()
}
