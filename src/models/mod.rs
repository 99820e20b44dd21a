mod alert;
mod article;
mod fetch_log;
mod post_log;
mod source;

pub use alert::{
    AlertClass, AlertLog, EmailAlertSubscription, NewSubscription, DEFAULT_COOLDOWN_MINUTES,
};
pub use article::{slugify, Article, ArticleDetail, ArticleStatus, NewArticle};
pub use fetch_log::{FetchLog, FetchStatus};
pub use post_log::{FacebookPostLog, PostStatus};
pub use source::{resolve_category, Category, NewSource, Source, DEFAULT_CATEGORY_SLUG};

/// One `<item>` pulled out of a feed. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: Option<String>,
    pub image_url: Option<String>,
}
