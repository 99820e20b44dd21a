//! In-memory stand-ins for the external collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::{RewriteOutput, Rewriter};
use crate::error::{AppError, Result};
use crate::feed::FeedSource;
use crate::services::mailer::{Mailer, OutgoingEmail};
use crate::services::relay::{Relay, RelayResponse, WebhookPayload};

#[derive(Default)]
pub struct FakeFeeds {
    feeds: HashMap<String, String>,
}

impl FakeFeeds {
    pub fn new() -> Self {
        Self::default()
    }

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
            .ok_or_else(|| AppError::Feed(format!("Failed to fetch feed: HTTP 404 for {}", url)))
    }
}

pub struct FakeRewriter {
    category: Option<String>,
}

impl FakeRewriter {
    pub fn ok(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { category: None }
    }
}

#[async_trait]
impl Rewriter for FakeRewriter {
    async fn rewrite(
        &self,
        title: &str,
        description: &str,
        _category_slugs: &[String],
    ) -> Result<RewriteOutput> {
        match &self.category {
            Some(category) => Ok(RewriteOutput {
                title: format!("Rewritten: {}", title),
                content: format!("{}\n\nMore context.", description),
                excerpt: description.to_string(),
                category_slug: category.clone(),
            }),
            None => Err(AppError::Rewriter("model unavailable".to_string())),
        }
    }
}

pub struct CountingRelay {
    status: u16,
    pub calls: AtomicUsize,
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
            body: format!(r#"{{"status":{}}}"#, self.status),
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(AppError::Mail("provider down".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
