//! Push approved articles to Facebook through the webhook relay.
//!
//! Each call is one attempt with its own `facebook_post_logs` row. An
//! article with a `success` row is never sent again.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::ai::truncate_chars;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{AlertClass, ArticleDetail, PostStatus};
use crate::services::mailer::{escape_html, Mailer, OutgoingEmail};
use crate::services::relay::{Relay, WebhookPayload, FACEBOOK_POST_ACTION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Posted { log_id: i64 },
    AlreadyPosted { log_id: i64 },
    Failed { log_id: i64, error: String },
    /// The relay URL or secret is missing; an operator has to fix config.
    Misconfigured { log_id: i64, error: String },
}

impl PublishOutcome {
    pub fn log_id(&self) -> i64 {
        match self {
            PublishOutcome::Posted { log_id }
            | PublishOutcome::AlreadyPosted { log_id }
            | PublishOutcome::Failed { log_id, .. }
            | PublishOutcome::Misconfigured { log_id, .. } => *log_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PublishOutcome::Posted { .. } | PublishOutcome::AlreadyPosted { .. }
        )
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PublishOutcome::Failed { error, .. } | PublishOutcome::Misconfigured { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkPublishResult {
    pub article_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Publisher {
    repo: Repository,
    relay: Option<Arc<dyn Relay>>,
    mailer: Option<Arc<dyn Mailer>>,
    site_url: String,
}

impl Publisher {
    pub fn new(
        repo: Repository,
        relay: Option<Arc<dyn Relay>>,
        mailer: Option<Arc<dyn Mailer>>,
        site_url: String,
    ) -> Self {
        Self {
            repo,
            relay,
            mailer,
            site_url,
        }
    }

    /// Returns `Err` only for a missing article or a storage failure; relay
    /// problems are reported through the outcome.
    pub async fn publish(&self, article_id: i64) -> Result<PublishOutcome> {
        let detail = self
            .repo
            .get_article_detail(article_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {}", article_id)))?;

        if let Some(log_id) = self.repo.find_success_post_log(article_id).await? {
            info!("Article {} already posted (log {})", article_id, log_id);
            // The flag may have been lost after the log was marked successful.
            if !detail.article.posted_to_facebook {
                self.repo.mark_posted_to_facebook(article_id).await?;
            }
            return Ok(PublishOutcome::AlreadyPosted { log_id });
        }

        let log_id = self.repo.insert_post_log(article_id, Utc::now()).await?;

        let Some(relay) = &self.relay else {
            let message = "Webhook URL or secret not configured".to_string();
            error!("Cannot post article {}: {}", article_id, message);
            self.repo
                .update_post_log(log_id, PostStatus::Failed, Some(message.clone()), None)
                .await?;
            return Ok(PublishOutcome::Misconfigured {
                log_id,
                error: message,
            });
        };

        let payload = self.build_payload(&detail);

        let failure = match relay.deliver(&payload).await {
            Ok(response) if response.is_success() => {
                self.repo
                    .update_post_log(log_id, PostStatus::Success, None, Some(response.body))
                    .await?;
                self.repo.mark_posted_to_facebook(article_id).await?;
                info!("Posted article {} to Facebook (log {})", article_id, log_id);
                return Ok(PublishOutcome::Posted { log_id });
            }
            Ok(response) => (
                format!("Webhook returned HTTP {}", response.status),
                Some(response.body),
            ),
            Err(e) => (e.to_string(), None),
        };

        let (message, raw) = failure;
        warn!("Facebook post for article {} failed: {}", article_id, message);
        self.repo
            .update_post_log(log_id, PostStatus::Failed, Some(message.clone()), raw)
            .await?;

        self.notify_failure(&detail, &message).await;

        Ok(PublishOutcome::Failed {
            log_id,
            error: message,
        })
    }

    /// Sequential bulk re-invocation from the admin screen.
    pub async fn publish_many(&self, article_ids: &[i64]) -> Vec<BulkPublishResult> {
        let mut results = Vec::with_capacity(article_ids.len());
        for &article_id in article_ids {
            let result = match self.publish(article_id).await {
                Ok(outcome) => BulkPublishResult {
                    article_id,
                    success: outcome.is_success(),
                    log_id: Some(outcome.log_id()),
                    error: outcome.error().map(str::to_string),
                },
                Err(e) => BulkPublishResult {
                    article_id,
                    success: false,
                    log_id: None,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }
        results
    }

    pub fn build_payload(&self, detail: &ArticleDetail) -> WebhookPayload {
        let article = &detail.article;
        WebhookPayload {
            article_id: article.id,
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            image_url: article.image_url.clone(),
            article_url: format!(
                "{}/article/{}",
                self.site_url.trim_end_matches('/'),
                article.slug
            ),
            category: detail.category_name.clone(),
            category_slug: detail.category_slug.clone(),
            publish_date: article
                .publish_date
                .or(article.feed_published_at)
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            source_name: detail.source_name.clone(),
            action: FACEBOOK_POST_ACTION.to_string(),
        }
    }

    /// Best effort: a mail failure is logged and never replaces the post failure.
    async fn notify_failure(&self, detail: &ArticleDetail, message: &str) {
        let Some(mailer) = &self.mailer else {
            warn!("No mailer configured, skipping Facebook failure alert");
            return;
        };

        let recipients = match self.repo.subscribers_for(AlertClass::ProcessingError).await {
            Ok(subs) => subs.into_iter().map(|s| s.email).collect::<Vec<_>>(),
            Err(e) => {
                error!("Failed to load alert subscribers: {}", e);
                return;
            }
        };

        if recipients.is_empty() {
            return;
        }

        let article = &detail.article;
        let email = OutgoingEmail {
            to: recipients,
            subject: format!(
                "Facebook post failed: {}",
                truncate_chars(&article.title, 60)
            ),
            html: format!(
                "<h2>Facebook post failed</h2>\
                 <p><strong>Article:</strong> {} (#{})</p>\
                 <p><strong>Error:</strong> {}</p>\
                 <p><strong>Time:</strong> {}</p>",
                escape_html(&article.title),
                article.id,
                escape_html(message),
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        };

        if let Err(e) = mailer.send(&email).await {
            error!("Failed to send Facebook failure alert: {}", e);
        }
    }
}
