use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Pending,
    Published,
    Rejected,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Pending => "pending",
            ArticleStatus::Published => "published",
            ArticleStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ArticleStatus::Draft),
            "pending" => Some(ArticleStatus::Pending),
            "published" => Some(ArticleStatus::Published),
            "rejected" => Some(ArticleStatus::Rejected),
            _ => None,
        }
    }

    /// Moderation transitions. Re-entering the same state is not a transition.
    pub fn can_transition_to(&self, next: ArticleStatus) -> bool {
        use ArticleStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Published)
                | (Draft, Rejected)
                | (Pending, Published)
                | (Pending, Rejected)
                | (Rejected, Pending)
                | (Rejected, Published)
                | (Published, Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub original_title: String,
    pub content: String,
    pub original_content: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub source_id: i64,
    pub category_id: Option<i64>,
    pub original_url: String,
    pub status: ArticleStatus,
    pub view_count: i64,
    pub publish_date: Option<DateTime<Utc>>,
    pub feed_published_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub is_breaking: bool,
    pub posted_to_facebook: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An article joined with the names the outbound payload needs.
#[derive(Debug, Clone)]
pub struct ArticleDetail {
    pub article: Article,
    pub source_name: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: String,
    pub title: String,
    pub original_title: String,
    pub content: String,
    pub original_content: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub source_id: i64,
    pub category_id: Option<i64>,
    pub original_url: String,
    pub feed_published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const MAX_SLUG_BASE: usize = 60;

/// Build a URL slug from a title, suffixed with a stable hash of the
/// original URL so two stories with the same headline never collide.
pub fn slugify(title: &str, original_url: &str) -> String {
    let mut base = String::new();
    let mut pending_dash = false;

    for c in title.chars() {
        let keep = if c.is_ascii() {
            c.is_ascii_alphanumeric()
        } else {
            !c.is_whitespace() && !is_unicode_punctuation(c)
        };

        if keep {
            if pending_dash && !base.is_empty() {
                base.push('-');
            }
            pending_dash = false;
            base.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }

        if base.chars().count() >= MAX_SLUG_BASE {
            break;
        }
    }

    let base = base.trim_end_matches('-');
    let suffix = format!("{:08x}", fnv1a(original_url.as_bytes()) as u32);
    if base.is_empty() {
        format!("article-{}", suffix)
    } else {
        format!("{}-{}", base, suffix)
    }
}

fn is_unicode_punctuation(c: char) -> bool {
    matches!(
        c,
        '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{205E}' | '\u{00A0}'..='\u{00BF}' | '\u{3000}'..='\u{303F}'
    )
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
