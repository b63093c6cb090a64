use crate::infrastructure::error::CoreError;
use std::fs;
use std::path::Path;

const SERVICES_JSON: &str = "services.json";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub task_service_base_url: String,
    pub integration_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            task_service_base_url: DEFAULT_BASE_URL.to_string(),
            integration_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), CoreError> {
    let path = config_dir.join(SERVICES_JSON);
    if !path.exists() {
        let defaults = serde_json::json!({
            "schema": 1,
            "taskServiceBaseUrl": DEFAULT_BASE_URL,
            "integrationBaseUrl": DEFAULT_BASE_URL,
        });
        let formatted = serde_json::to_string_pretty(&defaults)?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, CoreError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| CoreError::InvalidInput(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(CoreError::InvalidInput(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_service_config(config_dir: &Path) -> Result<ServiceConfig, CoreError> {
    let parsed = read_config(&config_dir.join(SERVICES_JSON))?;
    let mut config = ServiceConfig::default();

    if let Some(value) = string_field(&parsed, "taskServiceBaseUrl") {
        config.task_service_base_url = value;
    }
    if let Some(value) = string_field(&parsed, "integrationBaseUrl") {
        config.integration_base_url = value;
    }
    Ok(config)
}

fn string_field(parsed: &serde_json::Value, field: &str) -> Option<String> {
    parsed
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: std::path::PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "focusflow-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_once_and_load() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let config = load_service_config(&dir.path).expect("load config");
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(SERVICES_JSON),
            r#"{"schema": 1, "taskServiceBaseUrl": "http://tasks.local/api/", "integrationBaseUrl": "http://integration.local/api"}"#,
        )
        .expect("write config");

        let config = load_service_config(&dir.path).expect("load config");
        assert_eq!(config.task_service_base_url, "http://tasks.local/api");
        assert_eq!(config.integration_base_url, "http://integration.local/api");
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(SERVICES_JSON), r#"{"schema": 2}"#).expect("write config");
        assert!(load_service_config(&dir.path).is_err());
    }
}
