use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Success,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Success => "success",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "success" => Some(PostStatus::Success),
            "failed" => Some(PostStatus::Failed),
            _ => None,
        }
    }
}

/// One attempt to push an article through the Facebook relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookPostLog {
    pub id: i64,
    pub article_id: i64,
    pub status: PostStatus,
    pub error_message: Option<String>,
    pub response_data: Option<String>,
    pub created_at: DateTime<Utc>,
}
