use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    AlertClass, AlertLog, Article, ArticleDetail, ArticleStatus, Category,
    EmailAlertSubscription, FacebookPostLog, FetchLog, FetchStatus, NewArticle, NewSource,
    NewSubscription, PostStatus, Source,
};

use super::schema::SCHEMA;

const ARTICLE_COLUMNS: &str = r#"a.id, a.slug, a.title, a.original_title, a.content,
    a.original_content, a.excerpt, a.image_url, a.source_id, a.category_id,
    a.original_url, a.status, a.view_count, a.publish_date, a.feed_published_at,
    a.is_featured, a.is_breaking, a.posted_to_facebook, a.created_at, a.updated_at"#;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Source operations

    pub async fn insert_source(&self, source: NewSource) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sources (name, url) VALUES (?1, ?2)",
                    params![source.name, source.url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Returns `false` when the source does not exist.
    pub async fn set_source_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE sources SET is_active = ?1 WHERE id = ?2",
                    params![is_active, id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn get_active_sources(&self) -> Result<Vec<Source>> {
        let sources = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, url, is_active, created_at FROM sources WHERE is_active = 1 ORDER BY id",
                )?;
                let sources = stmt
                    .query_map([], source_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(sources)
            })
            .await?;
        Ok(sources)
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let categories = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name, slug FROM categories ORDER BY id")?;
                let categories = stmt
                    .query_map([], |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            slug: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(categories)
            })
            .await?;
        Ok(categories)
    }

    pub async fn source_exists_by_url(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sources WHERE url = ?1",
                    params![url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    // Article operations

    pub async fn article_exists_by_url(&self, original_url: &str) -> Result<bool> {
        let original_url = original_url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles WHERE original_url = ?1",
                    params![original_url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Insert a pending article. Returns `None` when another run already
    /// stored the same original URL.
    pub async fn insert_article(&self, article: NewArticle) -> Result<Option<i64>> {
        let id = self
            .conn
            .call(move |conn| {
                let created_at = fmt_datetime(article.created_at);
                let changed = conn.execute(
                    r#"INSERT INTO articles (slug, title, original_title, content, original_content,
                           excerpt, image_url, source_id, category_id, original_url, status,
                           view_count, publish_date, feed_published_at, is_featured, is_breaking,
                           posted_to_facebook, created_at, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending',
                           0, NULL, ?11, 0, 0, 0, ?12, ?12)
                       ON CONFLICT(original_url) DO NOTHING"#,
                    params![
                        article.slug,
                        article.title,
                        article.original_title,
                        article.content,
                        article.original_content,
                        article.excerpt,
                        article.image_url,
                        article.source_id,
                        article.category_id,
                        article.original_url,
                        fmt_datetime(article.feed_published_at),
                        created_at,
                    ],
                )?;
                if changed == 0 {
                    Ok(None)
                } else {
                    Ok(Some(conn.last_insert_rowid()))
                }
            })
            .await?;
        Ok(id)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM articles a WHERE a.id = ?1", ARTICLE_COLUMNS);
                let article = conn
                    .query_row(&sql, params![id], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn get_article_detail(&self, id: i64) -> Result<Option<ArticleDetail>> {
        let detail = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    r#"SELECT {}, s.name, c.name, c.slug
                       FROM articles a
                       LEFT JOIN sources s ON a.source_id = s.id
                       LEFT JOIN categories c ON a.category_id = c.id
                       WHERE a.id = ?1"#,
                    ARTICLE_COLUMNS
                );
                let detail = conn
                    .query_row(&sql, params![id], |row| {
                        Ok(ArticleDetail {
                            article: article_from_row(row)?,
                            source_name: row.get(20)?,
                            category_name: row.get(21)?,
                            category_slug: row.get(22)?,
                        })
                    })
                    .optional()?;
                Ok(detail)
            })
            .await?;
        Ok(detail)
    }

    pub async fn get_articles_by_status(&self, status: ArticleStatus) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM articles a WHERE a.status = ?1 ORDER BY a.created_at DESC",
                    ARTICLE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params![status.as_str()], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Mark an article published. `category_id` overrides the stored category when given.
    pub async fn publish_article(
        &self,
        id: i64,
        now: DateTime<Utc>,
        category_id: Option<i64>,
    ) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE articles
                       SET status = 'published', publish_date = ?2,
                           category_id = COALESCE(?3, category_id), updated_at = ?2
                       WHERE id = ?1"#,
                    params![id, fmt_datetime(now), category_id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn reject_article(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE articles
                       SET status = 'rejected', publish_date = NULL, updated_at = ?2
                       WHERE id = ?1"#,
                    params![id, fmt_datetime(now)],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn mark_posted_to_facebook(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET posted_to_facebook = 1, updated_at = ?2 WHERE id = ?1",
                    params![id, fmt_datetime(Utc::now())],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Returns `false` when the article does not exist.
    pub async fn increment_view_count(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE articles SET view_count = view_count + 1 WHERE id = ?1",
                    params![id],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn count_articles_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles WHERE created_at >= ?1",
                    params![fmt_datetime(since)],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Fetch log operations

    pub async fn start_fetch_log(&self, started_at: DateTime<Utc>) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO fetch_logs (started_at, status) VALUES (?1, 'running')",
                    params![fmt_datetime(started_at)],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn finish_fetch_log(
        &self,
        id: i64,
        status: FetchStatus,
        processed: i64,
        skipped: i64,
        error_message: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE fetch_logs
                       SET status = ?2, items_processed = ?3, items_skipped = ?4,
                           error_message = ?5, completed_at = ?6
                       WHERE id = ?1"#,
                    params![
                        id,
                        status.as_str(),
                        processed,
                        skipped,
                        error_message,
                        fmt_datetime(completed_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn latest_fetch_log(&self) -> Result<Option<FetchLog>> {
        let log = self
            .conn
            .call(|conn| {
                let log = conn
                    .query_row(
                        r#"SELECT id, started_at, completed_at, status, items_processed,
                                  items_skipped, error_message
                           FROM fetch_logs ORDER BY started_at DESC, id DESC LIMIT 1"#,
                        [],
                        fetch_log_from_row,
                    )
                    .optional()?;
                Ok(log)
            })
            .await?;
        Ok(log)
    }

    pub async fn recent_fetch_logs(&self, limit: i64) -> Result<Vec<FetchLog>> {
        let logs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, started_at, completed_at, status, items_processed,
                              items_skipped, error_message
                       FROM fetch_logs ORDER BY started_at DESC, id DESC LIMIT ?1"#,
                )?;
                let logs = stmt
                    .query_map(params![limit], fetch_log_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(logs)
            })
            .await?;
        Ok(logs)
    }

    // Facebook post log operations

    pub async fn find_success_post_log(&self, article_id: i64) -> Result<Option<i64>> {
        let id = self
            .conn
            .call(move |conn| {
                let id = conn
                    .query_row(
                        r#"SELECT id FROM facebook_post_logs
                           WHERE article_id = ?1 AND status = 'success'
                           ORDER BY id LIMIT 1"#,
                        params![article_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn insert_post_log(&self, article_id: i64, created_at: DateTime<Utc>) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO facebook_post_logs (article_id, status, created_at)
                       VALUES (?1, 'pending', ?2)"#,
                    params![article_id, fmt_datetime(created_at)],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn update_post_log(
        &self,
        id: i64,
        status: PostStatus,
        error_message: Option<String>,
        response_data: Option<String>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE facebook_post_logs
                       SET status = ?2, error_message = ?3, response_data = ?4
                       WHERE id = ?1"#,
                    params![id, status.as_str(), error_message, response_data],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn post_logs_for_article(&self, article_id: i64) -> Result<Vec<FacebookPostLog>> {
        let logs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, article_id, status, error_message, response_data, created_at
                       FROM facebook_post_logs WHERE article_id = ?1 ORDER BY id"#,
                )?;
                let logs = stmt
                    .query_map(params![article_id], post_log_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(logs)
            })
            .await?;
        Ok(logs)
    }

    // Alert subscriptions

    pub async fn upsert_subscription(&self, sub: NewSubscription) -> Result<i64> {
        let alert_types = serde_json::to_string(&sub.alert_types)?;
        let id = self
            .conn
            .call(move |conn| {
                let id = conn.query_row(
                    r#"INSERT INTO email_alert_subscriptions (user_id, email, alert_types, cooldown_minutes)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(user_id) DO UPDATE SET
                           email = excluded.email,
                           alert_types = excluded.alert_types,
                           cooldown_minutes = excluded.cooldown_minutes
                       RETURNING id"#,
                    params![sub.user_id, sub.email, alert_types, sub.cooldown_minutes],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn get_subscriptions(&self) -> Result<Vec<EmailAlertSubscription>> {
        let subs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, user_id, email, alert_types, last_sent_at, cooldown_minutes
                       FROM email_alert_subscriptions ORDER BY id"#,
                )?;
                let subs = stmt
                    .query_map([], subscription_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subs)
            })
            .await?;
        Ok(subs)
    }

    pub async fn subscribers_for(&self, class: AlertClass) -> Result<Vec<EmailAlertSubscription>> {
        let subs = self.get_subscriptions().await?;
        Ok(subs.into_iter().filter(|s| s.wants(class)).collect())
    }

    pub async fn mark_alert_sent(&self, subscription_id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_alert_subscriptions SET last_sent_at = ?2 WHERE id = ?1",
                    params![subscription_id, fmt_datetime(sent_at)],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_alert_log(
        &self,
        alert_types: Vec<String>,
        message: String,
        recipients: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let alert_types = alert_types.join(",");
        let recipients = serde_json::to_string(&recipients)?;
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO alert_logs (alert_types, message, recipients, created_at)
                       VALUES (?1, ?2, ?3, ?4)"#,
                    params![alert_types, message, recipients, fmt_datetime(created_at)],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_alert_logs(&self) -> Result<Vec<AlertLog>> {
        let logs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, alert_types, message, recipients, created_at FROM alert_logs ORDER BY id",
                )?;
                let logs = stmt
                    .query_map([], alert_log_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(logs)
            })
            .await?;
        Ok(logs)
    }
}

pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn required_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row
        .get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now))
}

fn optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| parse_datetime(&s)))
}

fn invalid_text(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value {:?}", value).into(),
    )
}

fn source_from_row(row: &Row) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        created_at: required_datetime(row, 4)?,
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    let status: String = row.get(11)?;
    Ok(Article {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        original_title: row.get(3)?,
        content: row.get(4)?,
        original_content: row.get(5)?,
        excerpt: row.get(6)?,
        image_url: row.get(7)?,
        source_id: row.get(8)?,
        category_id: row.get(9)?,
        original_url: row.get(10)?,
        status: ArticleStatus::parse(&status).ok_or_else(|| invalid_text(11, &status))?,
        view_count: row.get(12)?,
        publish_date: optional_datetime(row, 13)?,
        feed_published_at: optional_datetime(row, 14)?,
        is_featured: row.get::<_, i64>(15)? != 0,
        is_breaking: row.get::<_, i64>(16)? != 0,
        posted_to_facebook: row.get::<_, i64>(17)? != 0,
        created_at: required_datetime(row, 18)?,
        updated_at: required_datetime(row, 19)?,
    })
}

fn fetch_log_from_row(row: &Row) -> rusqlite::Result<FetchLog> {
    let status: String = row.get(3)?;
    Ok(FetchLog {
        id: row.get(0)?,
        started_at: required_datetime(row, 1)?,
        completed_at: optional_datetime(row, 2)?,
        status: FetchStatus::parse(&status).ok_or_else(|| invalid_text(3, &status))?,
        items_processed: row.get(4)?,
        items_skipped: row.get(5)?,
        error_message: row.get(6)?,
    })
}

fn post_log_from_row(row: &Row) -> rusqlite::Result<FacebookPostLog> {
    let status: String = row.get(2)?;
    Ok(FacebookPostLog {
        id: row.get(0)?,
        article_id: row.get(1)?,
        status: PostStatus::parse(&status).ok_or_else(|| invalid_text(2, &status))?,
        error_message: row.get(3)?,
        response_data: row.get(4)?,
        created_at: required_datetime(row, 5)?,
    })
}

fn subscription_from_row(row: &Row) -> rusqlite::Result<EmailAlertSubscription> {
    let alert_types: String = row.get(3)?;
    Ok(EmailAlertSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        // Unknown classes are ignored rather than failing the whole subscriber list.
        alert_types: serde_json::from_str::<Vec<serde_json::Value>>(&alert_types)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| serde_json::from_value::<AlertClass>(v).ok())
            .collect(),
        last_sent_at: optional_datetime(row, 4)?,
        cooldown_minutes: row.get(5)?,
    })
}

fn alert_log_from_row(row: &Row) -> rusqlite::Result<AlertLog> {
    let alert_types: String = row.get(1)?;
    let recipients: String = row.get(3)?;
    Ok(AlertLog {
        id: row.get(0)?,
        alert_types: alert_types
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        message: row.get(2)?,
        recipients: serde_json::from_str(&recipients).unwrap_or_default(),
        created_at: required_datetime(row, 4)?,
    })
}
