pub mod health;
pub mod ingest;
pub mod mailer;
pub mod moderation;
pub mod publisher;
pub mod relay;

#[cfg(test)]
pub(crate) mod test_support;

pub use health::{HealthIssue, HealthMonitor, HealthReport, HealthStatus};
pub use ingest::{IngestSettings, IngestSummary, Ingestor};
pub use mailer::{Mailer, OutgoingEmail, ResendMailer};
pub use moderation::{Moderation, ModerationResult};
pub use publisher::{BulkPublishResult, PublishOutcome, Publisher};
pub use relay::{Relay, RelayResponse, WebhookPayload, WebhookRelay};
