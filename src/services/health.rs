use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{AlertClass, FetchLog, FetchStatus};
use crate::services::mailer::{escape_html, Mailer, OutgoingEmail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthIssue {
    FetchFailed,
    FetchStale,
    NoRecentArticles,
    NoFetchLogs,
}

impl HealthIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthIssue::FetchFailed => "fetch_failed",
            HealthIssue::FetchStale => "fetch_stale",
            HealthIssue::NoRecentArticles => "no_recent_articles",
            HealthIssue::NoFetchLogs => "no_fetch_logs",
        }
    }

    fn describe(&self, stale_after: Duration) -> String {
        match self {
            HealthIssue::FetchFailed => "The latest RSS fetch run failed".to_string(),
            HealthIssue::FetchStale => format!(
                "No RSS fetch run has completed in the last {} minutes",
                stale_after.num_minutes()
            ),
            HealthIssue::NoRecentArticles => "No articles were created in the last hour".to_string(),
            HealthIssue::NoFetchLogs => "No RSS fetch run has ever been recorded".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    AlertSent,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<HealthIssue>,
    pub last_run: Option<FetchLog>,
    pub articles_last_hour: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notified: Vec<String>,
}

pub struct HealthMonitor {
    repo: Repository,
    mailer: Option<Arc<dyn Mailer>>,
    stale_after: Duration,
}

impl HealthMonitor {
    pub fn new(repo: Repository, mailer: Option<Arc<dyn Mailer>>, stale_after_minutes: i64) -> Self {
        Self {
            repo,
            mailer,
            stale_after: Duration::minutes(stale_after_minutes),
        }
    }

    pub async fn check(&self) -> Result<HealthReport> {
        self.check_at(Utc::now()).await
    }

    pub async fn check_at(&self, now: DateTime<Utc>) -> Result<HealthReport> {
        let last_run = self.repo.latest_fetch_log().await?;
        let articles_last_hour = self
            .repo
            .count_articles_created_since(now - Duration::hours(1))
            .await?;

        let issues = self.detect(last_run.as_ref(), articles_last_hour, now);

        let mut report = HealthReport {
            status: HealthStatus::Healthy,
            issues,
            last_run,
            articles_last_hour,
            notified: Vec::new(),
        };

        if report.issues.is_empty() {
            return Ok(report);
        }

        report.status = HealthStatus::Unhealthy;
        warn!(
            "Pipeline unhealthy: {}",
            report
                .issues
                .iter()
                .map(HealthIssue::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let eligible: Vec<_> = self
            .repo
            .subscribers_for(AlertClass::ProcessingError)
            .await?
            .into_iter()
            .filter(|s| s.is_due(now))
            .collect();

        if eligible.is_empty() {
            info!("No alert subscribers outside their cooldown");
            return Ok(report);
        }

        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| AppError::not_configured("RESEND_API_KEY"))?;

        let recipients: Vec<String> = eligible.iter().map(|s| s.email.clone()).collect();
        let message = self.compose_message(&report);
        let email = OutgoingEmail {
            to: recipients.clone(),
            subject: format!("[Seithi] Pipeline alert: {} issue(s)", report.issues.len()),
            html: self.compose_html(&report, now),
        };
        mailer.send(&email).await?;

        for sub in &eligible {
            self.repo.mark_alert_sent(sub.id, now).await?;
        }

        self.repo
            .insert_alert_log(
                report.issues.iter().map(|i| i.as_str().to_string()).collect(),
                message,
                recipients.clone(),
                now,
            )
            .await?;

        info!("Health alert sent to {} recipient(s)", recipients.len());
        report.status = HealthStatus::AlertSent;
        report.notified = recipients;
        Ok(report)
    }

    fn detect(
        &self,
        last_run: Option<&FetchLog>,
        articles_last_hour: i64,
        now: DateTime<Utc>,
    ) -> Vec<HealthIssue> {
        let mut issues = Vec::new();

        match last_run {
            None => issues.push(HealthIssue::NoFetchLogs),
            Some(run) => {
                if run.status == FetchStatus::Failed {
                    issues.push(HealthIssue::FetchFailed);
                }
                if now - run.last_activity() > self.stale_after {
                    issues.push(HealthIssue::FetchStale);
                }
            }
        }

        if articles_last_hour == 0 {
            issues.push(HealthIssue::NoRecentArticles);
        }

        issues
    }

    fn compose_message(&self, report: &HealthReport) -> String {
        report
            .issues
            .iter()
            .map(|i| i.describe(self.stale_after))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn compose_html(&self, report: &HealthReport, now: DateTime<Utc>) -> String {
        let items: String = report
            .issues
            .iter()
            .map(|i| format!("<li>{}</li>", escape_html(&i.describe(self.stale_after))))
            .collect();

        let last_run = match &report.last_run {
            Some(run) => format!(
                "<p><strong>Last run:</strong> #{} {}, started {}, processed {}, skipped {}</p>{}",
                run.id,
                run.status.as_str(),
                run.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                run.items_processed,
                run.items_skipped,
                run.error_message
                    .as_deref()
                    .map(|e| format!("<p><strong>Last error:</strong> {}</p>", escape_html(e)))
                    .unwrap_or_default(),
            ),
            None => "<p><strong>Last run:</strong> none recorded</p>".to_string(),
        };

        format!(
            "<h2>News pipeline health alert</h2>\
             <ul>{}</ul>\
             {}\
             <p><strong>Articles created in the last hour:</strong> {}</p>\
             <p><strong>Checked at:</strong> {}</p>",
            items,
            last_run,
            report.articles_last_hour,
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}
