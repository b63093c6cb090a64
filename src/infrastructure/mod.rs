pub mod config;
pub mod error;
pub mod integration_client;
pub mod logging;
pub mod snapshot_store;
pub mod snapshots;
pub mod storage;
pub mod task_client;
