pub mod models;
pub mod project_mapping;
