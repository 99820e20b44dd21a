use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const WEBHOOK_KEY_HEADER: &str = "X-Webhook-Key";
pub const FACEBOOK_POST_ACTION: &str = "facebook_post";

/// Body sent to the relay that performs the actual Facebook post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub article_id: i64,
    pub title: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub article_url: String,
    pub category: Option<String>,
    pub category_slug: Option<String>,
    pub publish_date: Option<String>,
    pub source_name: Option<String>,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: u16,
    pub body: String,
}

impl RelayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound hop to the relay. Transport failures are errors; HTTP
/// failures come back as a non-2xx [`RelayResponse`].
#[async_trait]
pub trait Relay: Send + Sync {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<RelayResponse>;
}

pub struct WebhookRelay {
    client: Client,
    url: String,
    secret: String,
}

impl WebhookRelay {
    pub fn new(url: String, secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url,
            secret,
        })
    }
}

#[async_trait]
impl Relay for WebhookRelay {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<RelayResponse> {
        let response = self
            .client
            .post(&self.url)
            .header(WEBHOOK_KEY_HEADER, &self.secret)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(RelayResponse { status, body })
    }
}
