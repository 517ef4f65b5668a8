use crate::core::error;
use crate::core::schemas;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit trail of store operations, one JSON object per line.
pub struct AuditLog {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub mod_name: Option<String>,
    pub status: String,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub diagnostic: Option<String>,
}

impl AuditLog {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(schemas::AUDIT_LOG_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_event(
        &self,
        op: &str,
        mod_name: Option<&str>,
        rows: usize,
        diagnostic: Option<&str>,
    ) -> Result<(), error::MhwimmError> {
        let ev = StoreEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            mod_name: mod_name.map(|s| s.to_string()),
            status: if diagnostic.is_none() { "success" } else { "error" }.to_string(),
            rows,
            diagnostic: diagnostic.map(|s| s.to_string()),
        };

        let line = serde_json::to_string(&ev).map_err(|e| {
            error::MhwimmError::ValidationError(format!("failed to encode audit event: {}", e))
        })?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(error::MhwimmError::IoError)?;

        writeln!(f, "{}", line).map_err(error::MhwimmError::IoError)?;
        Ok(())
    }
}

/// Read back every event in the audit log.
pub fn read_events(root: &Path) -> Result<Vec<StoreEvent>, error::MhwimmError> {
    let path = root.join(schemas::AUDIT_LOG_NAME);
    let text = std::fs::read_to_string(&path).map_err(error::MhwimmError::IoError)?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l).map_err(|e| {
                error::MhwimmError::ValidationError(format!("bad audit line in {}: {}", path.display(), e))
            })
        })
        .collect()
}
