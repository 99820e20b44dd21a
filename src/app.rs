use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ai::{GeminiRewriter, Rewriter};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::{FeedSource, HttpFeedFetcher};
use crate::models::{
    AlertClass, AlertLog, Article, ArticleStatus, FacebookPostLog, FetchLog, NewSource,
    NewSubscription, DEFAULT_COOLDOWN_MINUTES,
};
use crate::services::{
    BulkPublishResult, HealthMonitor, HealthReport, IngestSettings, IngestSummary, Ingestor,
    Mailer, Moderation, ModerationResult, PublishOutcome, Publisher, Relay, ResendMailer,
    WebhookRelay,
};

const MAX_FETCH_LOG_LIMIT: i64 = 100;

/// Everything the HTTP handlers and CLI need, wired once at startup.
pub struct App {
    config: Config,
    repo: Repository,
    feeds: Arc<dyn FeedSource>,
    rewriter: Option<Arc<dyn Rewriter>>,
    settings: IngestSettings,
    publisher: Publisher,
    health: HealthMonitor,
    moderation: Moderation,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repo = Repository::new(&config.db_path).await?;
        let feeds: Arc<dyn FeedSource> = Arc::new(HttpFeedFetcher::new()?);

        let rewriter = match config.require_gemini_key() {
            Ok(_) => Some(gemini_rewriter(config)?),
            Err(e) => {
                warn!("{}; ingestion runs will be refused", e);
                None
            }
        };

        let relay = match config.webhook() {
            Some((url, secret)) => Some(Arc::new(WebhookRelay::new(
                url.to_string(),
                secret.to_string(),
            )?) as Arc<dyn Relay>),
            None => None,
        };

        let mailer = match config.require_resend_key() {
            Ok(key) => Some(Arc::new(ResendMailer::new(
                key.to_string(),
                config.resend_api_base.clone(),
                config.alert_from_email.clone(),
            )?) as Arc<dyn Mailer>),
            Err(_) => None,
        };

        info!(
            "Services: rewriter={}, relay={}, mailer={}",
            rewriter.is_some(),
            relay.is_some(),
            mailer.is_some()
        );

        Ok(Self::with_services(config, repo, feeds, rewriter, relay, mailer))
    }

    /// Assemble from ready-made collaborators. Without a `rewriter`, one is
    /// built from the Gemini settings when a run starts.
    pub fn with_services(
        config: &Config,
        repo: Repository,
        feeds: Arc<dyn FeedSource>,
        rewriter: Option<Arc<dyn Rewriter>>,
        relay: Option<Arc<dyn Relay>>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let publisher = Publisher::new(repo.clone(), relay, mailer.clone(), config.site_url.clone());
        let health = HealthMonitor::new(repo.clone(), mailer, config.stale_after_minutes);
        let moderation = Moderation::new(repo.clone(), publisher.clone(), config.auto_post_on_publish);

        Self {
            config: config.clone(),
            repo,
            feeds,
            rewriter,
            settings: IngestSettings {
                max_items_per_source: config.max_items_per_source,
                rewrite_delay: Duration::from_millis(config.rewrite_delay_ms),
            },
            publisher,
            health,
            moderation,
        }
    }

    pub async fn run_ingestion(&self) -> Result<IngestSummary> {
        let rewriter = match &self.rewriter {
            Some(rewriter) => rewriter.clone(),
            None => gemini_rewriter(&self.config)?,
        };

        Ingestor::new(
            self.repo.clone(),
            self.feeds.clone(),
            rewriter,
            self.settings.clone(),
        )
        .run()
        .await
    }

    pub async fn publish_to_facebook(&self, article_id: i64) -> Result<PublishOutcome> {
        self.publisher.publish(article_id).await
    }

    pub async fn publish_many(&self, article_ids: &[i64]) -> Vec<BulkPublishResult> {
        self.publisher.publish_many(article_ids).await
    }

    pub async fn check_health(&self) -> Result<HealthReport> {
        self.health.check().await
    }

    pub async fn publish_article(
        &self,
        id: i64,
        category_id: Option<i64>,
    ) -> Result<ModerationResult> {
        self.moderation.publish(id, category_id).await
    }

    pub async fn reject_article(&self, id: i64) -> Result<ModerationResult> {
        self.moderation.reject(id).await
    }

    pub async fn record_view(&self, id: i64) -> Result<i64> {
        self.moderation.record_view(id).await
    }

    /// Moderation queue and archive listings, newest first.
    pub async fn articles_by_status(&self, status: &str) -> Result<Vec<Article>> {
        let status = ArticleStatus::parse(status)
            .ok_or_else(|| AppError::Validation(format!("Unknown article status {:?}", status)))?;
        self.repo.get_articles_by_status(status).await
    }

    pub async fn post_logs(&self, article_id: i64) -> Result<Vec<FacebookPostLog>> {
        if self.repo.get_article(article_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Article {}", article_id)));
        }
        self.repo.post_logs_for_article(article_id).await
    }

    pub async fn alert_logs(&self) -> Result<Vec<AlertLog>> {
        self.repo.get_alert_logs().await
    }

    pub async fn recent_fetch_logs(&self, limit: Option<i64>) -> Result<Vec<FetchLog>> {
        let limit = limit.unwrap_or(20).clamp(1, MAX_FETCH_LOG_LIMIT);
        self.repo.recent_fetch_logs(limit).await
    }

    pub async fn add_source(&self, name: &str, url: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Source name is required".to_string()));
        }
        let parsed = url::Url::parse(url.trim())
            .map_err(|e| AppError::Validation(format!("Invalid feed URL {:?}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "Feed URL must be http(s): {}",
                url
            )));
        }

        if self.repo.source_exists_by_url(parsed.as_str()).await? {
            return Err(AppError::Conflict(format!("Source {} already exists", parsed)));
        }

        let id = self
            .repo
            .insert_source(NewSource {
                name: name.to_string(),
                url: parsed.to_string(),
            })
            .await?;
        info!("Added source {} ({})", name, parsed);
        Ok(id)
    }

    /// Inactive sources are skipped by ingestion runs.
    pub async fn set_source_active(&self, id: i64, is_active: bool) -> Result<()> {
        if !self.repo.set_source_active(id, is_active).await? {
            return Err(AppError::NotFound(format!("Source {}", id)));
        }
        info!("Source {} {}", id, if is_active { "activated" } else { "deactivated" });
        Ok(())
    }

    pub async fn subscribe(
        &self,
        user_id: &str,
        email: &str,
        cooldown_minutes: Option<i64>,
    ) -> Result<i64> {
        let email = email.trim();
        if user_id.trim().is_empty() || !email.contains('@') {
            return Err(AppError::Validation(
                "A user id and a valid email address are required".to_string(),
            ));
        }
        let cooldown_minutes = cooldown_minutes.unwrap_or(DEFAULT_COOLDOWN_MINUTES);
        if cooldown_minutes < 0 {
            return Err(AppError::Validation(
                "Cooldown must not be negative".to_string(),
            ));
        }

        self.repo
            .upsert_subscription(NewSubscription {
                user_id: user_id.trim().to_string(),
                email: email.to_string(),
                alert_types: vec![AlertClass::ProcessingError],
                cooldown_minutes,
            })
            .await
    }
}

fn gemini_rewriter(config: &Config) -> Result<Arc<dyn Rewriter>> {
    let key = config.require_gemini_key()?;
    Ok(Arc::new(GeminiRewriter::new(
        key.to_string(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
    )?))
}
