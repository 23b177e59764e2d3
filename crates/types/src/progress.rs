use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a single install invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Resolving,
    Validating,
    Loading,
    Complete,
    Failed,
}

impl InstallStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallStatus::Complete | InstallStatus::Failed)
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallStatus::Resolving => "resolving",
            InstallStatus::Validating => "validating",
            InstallStatus::Loading => "loading",
            InstallStatus::Complete => "complete",
            InstallStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Status update emitted at each install state transition. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallProgress {
    pub id: String,
    pub status: InstallStatus,
    /// Indicative percentage, 0 to 100.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
