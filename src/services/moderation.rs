//! Editorial state changes on stored articles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Article, ArticleStatus};
use crate::services::publisher::{PublishOutcome, Publisher};

#[derive(Debug, Clone, Serialize)]
pub struct ModerationResult {
    pub article: Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<PublishOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_error: Option<String>,
}

impl ModerationResult {
    fn plain(article: Article) -> Self {
        Self {
            article,
            facebook: None,
            facebook_error: None,
        }
    }
}

pub struct Moderation {
    repo: Repository,
    publisher: Publisher,
    auto_post: bool,
}

impl Moderation {
    pub fn new(repo: Repository, publisher: Publisher, auto_post: bool) -> Self {
        Self {
            repo,
            publisher,
            auto_post,
        }
    }

    pub async fn publish(&self, id: i64, category_id: Option<i64>) -> Result<ModerationResult> {
        self.publish_at(id, category_id, Utc::now()).await
    }

    /// Publishing stays in effect even when the follow-up social post fails.
    pub async fn publish_at(
        &self,
        id: i64,
        category_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<ModerationResult> {
        let article = self.load(id).await?;
        check_transition(&article, ArticleStatus::Published)?;

        if let Some(category_id) = category_id {
            let categories = self.repo.get_categories().await?;
            if !categories.iter().any(|c| c.id == category_id) {
                return Err(AppError::Validation(format!(
                    "Unknown category_id {}",
                    category_id
                )));
            }
        }

        self.repo.publish_article(id, now, category_id).await?;
        info!("Article {} published", id);

        let mut result = ModerationResult::plain(self.load(id).await?);
        if !self.auto_post {
            return Ok(result);
        }

        match self.publisher.publish(id).await {
            Ok(outcome) => {
                result.facebook_error = outcome.error().map(str::to_string);
                result.facebook = Some(outcome);
                // Pick up posted_to_facebook.
                result.article = self.load(id).await?;
            }
            Err(e) => {
                warn!("Auto-post for article {} failed: {}", id, e);
                result.facebook_error = Some(e.to_string());
            }
        }

        Ok(result)
    }

    pub async fn reject(&self, id: i64) -> Result<ModerationResult> {
        self.reject_at(id, Utc::now()).await
    }

    pub async fn reject_at(&self, id: i64, now: DateTime<Utc>) -> Result<ModerationResult> {
        let article = self.load(id).await?;
        check_transition(&article, ArticleStatus::Rejected)?;

        self.repo.reject_article(id, now).await?;
        info!("Article {} rejected", id);
        Ok(ModerationResult::plain(self.load(id).await?))
    }

    /// Returns the new view count.
    pub async fn record_view(&self, id: i64) -> Result<i64> {
        if !self.repo.increment_view_count(id).await? {
            return Err(AppError::NotFound(format!("Article {}", id)));
        }
        Ok(self.load(id).await?.view_count)
    }

    async fn load(&self, id: i64) -> Result<Article> {
        self.repo
            .get_article(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {}", id)))
    }
}

fn check_transition(article: &Article, next: ArticleStatus) -> Result<()> {
    if article.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Article {} cannot move from {} to {}",
            article.id,
            article.status.as_str(),
            next.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{slugify, NewArticle, NewSource};
    use crate::services::test_support::CountingRelay;

    async fn pending_article(repo: &Repository) -> i64 {
        let source_id = repo
            .insert_source(NewSource {
                name: "Malaysiakini".to_string(),
                url: "https://src/feed".to_string(),
            })
            .await
            .unwrap();
        let now = Utc::now();
        repo.insert_article(NewArticle {
            slug: slugify("Story", "https://src/1"),
            title: "Story".to_string(),
            original_title: "Story".to_string(),
            content: "Body".to_string(),
            original_content: "Body".to_string(),
            excerpt: "Body".to_string(),
            image_url: None,
            source_id,
            category_id: None,
            original_url: "https://src/1".to_string(),
            feed_published_at: now,
            created_at: now,
        })
        .await
        .unwrap()
        .unwrap()
    }

    fn moderation(repo: &Repository, relay: Option<Arc<CountingRelay>>, auto_post: bool) -> Moderation {
        let relay = relay.map(|r| r as Arc<dyn crate::services::relay::Relay>);
        let publisher = Publisher::new(repo.clone(), relay, None, "https://seithi.test".to_string());
        Moderation::new(repo.clone(), publisher, auto_post)
    }

    #[tokio::test]
    async fn test_publish_then_reject_round_trip() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let gate = moderation(&repo, None, false);

        let published = gate.publish(id, None).await.unwrap();
        assert_eq!(published.article.status, ArticleStatus::Published);
        assert!(published.article.publish_date.is_some());
        assert!(published.facebook.is_none());

        let rejected = gate.reject(id).await.unwrap();
        assert_eq!(rejected.article.status, ArticleStatus::Rejected);
        assert!(rejected.article.publish_date.is_none());

        let again = gate.publish(id, None).await.unwrap();
        assert_eq!(again.article.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn test_invalid_transitions_conflict() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let gate = moderation(&repo, None, false);

        gate.publish(id, None).await.unwrap();
        assert!(matches!(gate.publish(id, None).await, Err(AppError::Conflict(_))));

        gate.reject(id).await.unwrap();
        assert!(matches!(gate.reject(id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_publish_overrides_category() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let sports = repo
            .get_categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.slug == "sports")
            .unwrap();
        let gate = moderation(&repo, None, false);

        let result = gate.publish(id, Some(sports.id)).await.unwrap();
        assert_eq!(result.article.category_id, Some(sports.id));

        let repo2 = Repository::open_in_memory().await.unwrap();
        let id2 = pending_article(&repo2).await;
        let gate2 = moderation(&repo2, None, false);
        assert!(matches!(
            gate2.publish(id2, Some(9999)).await,
            Err(AppError::Validation(_))
        ));
        let untouched = repo2.get_article(id2).await.unwrap().unwrap();
        assert_eq!(untouched.status, ArticleStatus::Pending);
    }

    #[tokio::test]
    async fn test_publish_auto_posts() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let relay = Arc::new(CountingRelay::with_status(200));
        let gate = moderation(&repo, Some(relay.clone()), true);

        let result = gate.publish(id, None).await.unwrap();
        assert!(matches!(result.facebook, Some(PublishOutcome::Posted { .. })));
        assert!(result.facebook_error.is_none());
        assert!(result.article.posted_to_facebook);
        assert_eq!(relay.call_count(), 1);
    }

    #[tokio::test]
    async fn test_relay_failure_keeps_article_published() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let relay = Arc::new(CountingRelay::with_status(500));
        let gate = moderation(&repo, Some(relay), true);

        let result = gate.publish(id, None).await.unwrap();
        assert_eq!(result.article.status, ArticleStatus::Published);
        assert!(!result.article.posted_to_facebook);
        assert!(result.facebook_error.is_some());
    }

    #[tokio::test]
    async fn test_record_view_increments() {
        let repo = Repository::open_in_memory().await.unwrap();
        let id = pending_article(&repo).await;
        let gate = moderation(&repo, None, false);

        assert_eq!(gate.record_view(id).await.unwrap(), 1);
        assert_eq!(gate.record_view(id).await.unwrap(), 2);
        assert!(matches!(gate.record_view(999).await, Err(AppError::NotFound(_))));
    }
}
