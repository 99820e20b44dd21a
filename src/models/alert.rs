use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertClass {
    ProcessingError,
    BreakingNews,
    DailyDigest,
}

pub const DEFAULT_COOLDOWN_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAlertSubscription {
    pub id: i64,
    pub user_id: String,
    pub email: String,
    pub alert_types: Vec<AlertClass>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub cooldown_minutes: i64,
}

impl EmailAlertSubscription {
    pub fn wants(&self, class: AlertClass) -> bool {
        self.alert_types.contains(&class)
    }

    /// True once this subscriber's own cooldown has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_sent_at {
            None => true,
            Some(last) => now - last >= Duration::minutes(self.cooldown_minutes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: String,
    pub email: String,
    pub alert_types: Vec<AlertClass>,
    pub cooldown_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLog {
    pub id: i64,
    pub alert_types: Vec<String>,
    pub message: String,
    pub recipients: Vec<String>,
    pub created_at: DateTime<Utc>,
}
