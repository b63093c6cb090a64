use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Append-only JSON-line log. Logging failures are swallowed; the log is
/// diagnostic, never load-bearing.
#[derive(Debug)]
pub struct CoreLogger {
    log_path: Option<PathBuf>,
    guard: Mutex<()>,
}

impl CoreLogger {
    pub fn new(logs_dir: PathBuf) -> Self {
        Self {
            log_path: Some(logs_dir.join("core.log")),
            guard: Mutex::new(()),
        }
    }

    /// Logger that discards everything; used by in-memory setups and tests.
    pub fn disabled() -> Self {
        Self {
            log_path: None,
            guard: Mutex::new(()),
        }
    }

    pub fn info(&self, operation: &str, message: &str) {
        self.append("info", operation, message);
    }

    pub fn error(&self, operation: &str, message: &str) {
        self.append("error", operation, message);
    }

    fn append(&self, level: &str, operation: &str, message: &str) {
        let Some(path) = self.log_path.as_ref() else {
            return;
        };
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "operation": operation,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{payload}");
        }
    }
}
