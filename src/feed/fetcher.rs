use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::error::{AppError, Result};

/// Upper bound on a feed body; anything larger is treated as a bad source.
pub const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

/// Where raw feed text comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; SeithiBot/1.0; +https://seithi.example.com)")
            .build()?;

        Ok(Self { client })
    }
}

fn too_large(bytes: u64) -> AppError {
    AppError::Feed(format!(
        "Feed too large: {} bytes (limit {})",
        bytes, MAX_FEED_BYTES
    ))
}

#[async_trait]
impl FeedSource for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut response = self
            .client
            .get(url)
            .header("Accept", "application/rss+xml, application/xml, text/xml, */*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Feed(format!(
                "Failed to fetch feed: HTTP {}",
                response.status()
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_FEED_BYTES as u64 {
                return Err(too_large(len));
            }
        }

        let header_charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_param);

        // Chunked bodies carry no length, so the cap is enforced while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_FEED_BYTES {
                return Err(too_large((body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(decode_feed(&body, header_charset.as_deref()))
    }
}

fn xml_encoding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*?\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
    })
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Decode a feed body. A byte order mark wins, then the Content-Type charset,
/// then the XML declaration. Unknown labels fall back to UTF-8.
fn decode_feed(bytes: &[u8], header_charset: Option<&str>) -> String {
    let declared = || {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        xml_encoding_re()
            .captures(&head)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
    };

    let encoding = header_charset
        .map(str::to_string)
        .or_else(declared)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
