use chrono::{DateTime, Utc};

use crate::{CreditBalance, Identity, Notice, ProgressState, TargetFormat, WorkflowState};

/// Snapshot handed to presentation after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub workflow: WorkflowState,
    pub balance: CreditBalance,
    pub identity: Option<Identity>,
    pub files: Vec<FileRowView>,
    pub target: Option<TargetFormat>,
    pub progress: ProgressState,
    pub artifacts: Vec<ArtifactView>,
    pub notice: Option<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactView {
    pub filename: String,
    pub reference: String,
}

/// Human-readable byte size, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
