mod fetcher;
pub mod parser;

pub use fetcher::{FeedSource, HttpFeedFetcher, MAX_FEED_BYTES};
pub use parser::{normalize_publish_date, parse_items};
