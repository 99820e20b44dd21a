//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seithi::ai::{RewriteOutput, Rewriter};
use seithi::db::Repository;
use seithi::feed::FeedSource;
use seithi::services::{Relay, RelayResponse, WebhookPayload};
use seithi::{App, AppError, Config, Result};

pub const FEED_URL: &str = "https://partner.test/rss";

pub const SINGLE_ITEM_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/"><channel>
  <title>Partner</title>
  <item>
    <title>PM Announces Policy</title>
    <link>https://partner.test/a1</link>
    <description><![CDATA[<p>Text</p>]]></description>
    <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    <media:content url="https://partner.test/a1.jpg" medium="image"/>
  </item>
</channel></rss>"#;

#[derive(Default)]
pub struct FakeFeeds {
    feeds: HashMap<String, String>,
}

impl FakeFeeds {
    pub fn with_feed(mut self, url: &str, body: &str) -> Self {
        self.feeds.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl FeedSource for FakeFeeds {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Feed(format!("no feed at {}", url)))
    }
}

pub struct EchoRewriter;

#[async_trait]
impl Rewriter for EchoRewriter {
    async fn rewrite(
        &self,
        title: &str,
        description: &str,
        _category_slugs: &[String],
    ) -> Result<RewriteOutput> {
        Ok(RewriteOutput {
            title: format!("{} (rewritten)", title),
            content: description.to_string(),
            excerpt: description.to_string(),
            category_slug: "politics".to_string(),
        })
    }
}

pub struct CountingRelay {
    status: u16,
    calls: AtomicUsize,
    pub payloads: Mutex<Vec<WebhookPayload>>,
}

impl CountingRelay {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Relay for CountingRelay {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<RelayResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(RelayResponse {
            status: self.status,
            body: "{}".to_string(),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        site_url: "https://seithi.test".to_string(),
        rewrite_delay_ms: 0,
        ..Config::default()
    }
}

/// App over an in-memory database with one registered source.
pub async fn test_app(
    rewriter: Option<Arc<dyn Rewriter>>,
    relay: Option<Arc<dyn Relay>>,
) -> Arc<App> {
    let repo = Repository::open_in_memory().await.unwrap();
    let feeds = FakeFeeds::default().with_feed(FEED_URL, SINGLE_ITEM_FEED);
    let app = App::with_services(
        &test_config(),
        repo,
        Arc::new(feeds),
        rewriter,
        relay,
        None,
    );
    app.add_source("Partner", FEED_URL).await.unwrap();
    Arc::new(app)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
