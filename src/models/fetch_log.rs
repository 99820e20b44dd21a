use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Running,
    Success,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Running => "running",
            FetchStatus::Success => "success",
            FetchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(FetchStatus::Running),
            "success" => Some(FetchStatus::Success),
            "failed" => Some(FetchStatus::Failed),
            _ => None,
        }
    }
}

/// One ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: FetchStatus,
    pub items_processed: i64,
    pub items_skipped: i64,
    pub error_message: Option<String>,
}

impl FetchLog {
    /// Completion time, or start time for a run that never finished.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.started_at)
    }
}
