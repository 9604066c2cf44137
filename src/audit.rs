/// Audit logging for configuration changes
///
/// Every resource-group commit and packet-classifier set is appended to a
/// JSON-lines log. Failing to write the log never fails the operation.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Commit,
    GpcSet,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    pub event_type: EventType,

    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if the operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// Appends an event as one JSON line.
    pub fn log(&self, event: &AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(event)?;
        crate::utils::ensure_parent_dir(&self.log_path)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        Ok(())
    }

    /// Reads the most recent events, newest first
    pub fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.log_path)?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .take(count)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

fn write_event(log_path: Option<&Path>, event: &AuditEvent) {
    let Some(path) = log_path else {
        return;
    };
    let audit = AuditLog::new(path);
    if let Err(e) = audit.log(event) {
        tracing::warn!("Failed to write audit log {}: {}", audit.path().display(), e);
    }
}

/// Logs a resource-group commit
pub fn log_commit(
    log_path: Option<&Path>,
    operation_count: usize,
    success: bool,
    error: Option<String>,
) {
    let event = AuditEvent::new(
        EventType::Commit,
        success,
        serde_json::json!({
            "operation_count": operation_count,
        }),
        error,
    );
    write_event(log_path, &event);
}

/// Logs a packet-classifier config set
pub fn log_gpc_set(log_path: Option<&Path>, group_count: usize, success: bool, error: Option<String>) {
    let event = AuditEvent::new(
        EventType::GpcSet,
        success,
        serde_json::json!({
            "group_count": group_count,
        }),
        error,
    );
    write_event(log_path, &event);
}
