//! One ingestion run: sources → feed text → rewrite → pending articles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::ai::{fallback_rewrite, Rewriter};
use crate::db::Repository;
use crate::error::Result;
use crate::feed::{normalize_publish_date, parse_items, FeedSource};
use crate::models::{
    resolve_category, slugify, Category, FetchStatus, NewArticle, RawFeedItem, Source,
};

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub max_items_per_source: usize,
    /// Pause between successive rewrite calls.
    pub rewrite_delay: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_items_per_source: 10,
            rewrite_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl IngestSummary {
    fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join("; "))
        }
    }
}

pub struct Ingestor {
    repo: Repository,
    feeds: Arc<dyn FeedSource>,
    rewriter: Arc<dyn Rewriter>,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(
        repo: Repository,
        feeds: Arc<dyn FeedSource>,
        rewriter: Arc<dyn Rewriter>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            repo,
            feeds,
            rewriter,
            settings,
        }
    }

    /// Run once. The fetch log row is always finalised, as `failed` when the
    /// run itself errors out.
    pub async fn run(&self) -> Result<IngestSummary> {
        let log_id = self.repo.start_fetch_log(Utc::now()).await?;
        info!("Ingestion run {} started", log_id);

        let mut summary = IngestSummary::default();
        let outcome = self.process_sources(&mut summary).await;

        let (status, message) = match &outcome {
            Ok(()) => (FetchStatus::Success, summary.error_message()),
            Err(e) => {
                let mut message = e.to_string();
                if let Some(partial) = summary.error_message() {
                    message = format!("{}; {}", message, partial);
                }
                (FetchStatus::Failed, Some(message))
            }
        };

        if let Err(e) = self
            .repo
            .finish_fetch_log(
                log_id,
                status,
                summary.processed as i64,
                summary.skipped as i64,
                message,
                Utc::now(),
            )
            .await
        {
            error!("Failed to finalise fetch log {}: {}", log_id, e);
        }

        match outcome {
            Ok(()) => {
                info!(
                    "Ingestion run {} finished: {} processed, {} skipped, {} error(s)",
                    log_id,
                    summary.processed,
                    summary.skipped,
                    summary.errors.len()
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Ingestion run {} failed: {}", log_id, e);
                Err(e)
            }
        }
    }

    async fn process_sources(&self, summary: &mut IngestSummary) -> Result<()> {
        let sources = self.repo.get_active_sources().await?;
        if sources.is_empty() {
            info!("No active sources");
            return Ok(());
        }

        let categories = self.repo.get_categories().await?;
        let category_slugs: Vec<String> = categories.iter().map(|c| c.slug.clone()).collect();
        let mut rewrites = 0usize;

        for source in &sources {
            let body = match self.feeds.fetch(&source.url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to fetch {}: {}", source.url, e);
                    summary.errors.push(format!("{}: {}", source.name, e));
                    continue;
                }
            };

            let items: Vec<RawFeedItem> = parse_items(&body)
                .take(self.settings.max_items_per_source)
                .collect();
            debug!("{} item(s) from {}", items.len(), source.name);

            for item in items {
                match self.repo.article_exists_by_url(&item.link).await {
                    Ok(true) => {
                        summary.skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        summary.errors.push(format!("{}: {}", item.link, e));
                        continue;
                    }
                }

                if rewrites > 0 && !self.settings.rewrite_delay.is_zero() {
                    tokio::time::sleep(self.settings.rewrite_delay).await;
                }
                rewrites += 1;

                let article = self
                    .prepare_article(source, &item, &categories, &category_slugs)
                    .await;

                match self.repo.insert_article(article).await {
                    Ok(Some(id)) => {
                        debug!("Stored article {} from {}", id, item.link);
                        summary.processed += 1;
                    }
                    // Another run stored this URL between our check and insert.
                    Ok(None) => summary.skipped += 1,
                    Err(e) => {
                        error!("Failed to store {}: {}", item.link, e);
                        summary.errors.push(format!("{}: {}", item.link, e));
                    }
                }
            }
        }

        Ok(())
    }

    async fn prepare_article(
        &self,
        source: &Source,
        item: &RawFeedItem,
        categories: &[Category],
        category_slugs: &[String],
    ) -> NewArticle {
        let rewritten = match self
            .rewriter
            .rewrite(&item.title, &item.description, category_slugs)
            .await
        {
            Ok(rewritten) => rewritten,
            Err(e) => {
                warn!("Rewrite failed for {}, keeping original text: {}", item.link, e);
                fallback_rewrite(&item.title, &item.description)
            }
        };

        let now = Utc::now();
        let category_id = resolve_category(categories, &rewritten.category_slug).map(|c| c.id);

        NewArticle {
            slug: slugify(&rewritten.title, &item.link),
            title: rewritten.title,
            original_title: item.title.clone(),
            content: rewritten.content,
            original_content: item.description.clone(),
            excerpt: rewritten.excerpt,
            image_url: item.image_url.clone(),
            source_id: source.id,
            category_id,
            original_url: item.link.clone(),
            feed_published_at: normalize_publish_date(item.pub_date.as_deref(), now),
            created_at: now,
        }
    }
}
