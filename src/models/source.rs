use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Category every article falls back to when the rewriter cannot place it.
pub const DEFAULT_CATEGORY_SLUG: &str = "national";

/// Find the category for `slug`, falling back to the default category.
pub fn resolve_category<'a>(categories: &'a [Category], slug: &str) -> Option<&'a Category> {
    let wanted = slug.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.slug == wanted)
        .or_else(|| categories.iter().find(|c| c.slug == DEFAULT_CATEGORY_SLUG))
}
