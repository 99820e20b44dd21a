use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DEFAULT_CATEGORY_SLUG;

pub const MAX_EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutput {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category_slug: String,
}

/// Opaque text transform backed by a generative model. Implementations
/// report failure; the fallback policy belongs to the caller.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(
        &self,
        title: &str,
        description: &str,
        category_slugs: &[String],
    ) -> Result<RewriteOutput>;
}

/// Verbatim content used whenever the model cannot be reached or answers badly.
pub fn fallback_rewrite(title: &str, description: &str) -> RewriteOutput {
    RewriteOutput {
        title: title.to_string(),
        content: description.to_string(),
        excerpt: truncate_chars(description, MAX_EXCERPT_CHARS),
        category_slug: DEFAULT_CATEGORY_SLUG.to_string(),
    }
}

/// Truncate to at most `max` characters, ending in an ellipsis when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    title: Option<String>,
    content: Option<String>,
    excerpt: Option<String>,
    category: Option<String>,
}

pub struct GeminiRewriter {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiRewriter {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key,
            api_base,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    async fn rewrite(
        &self,
        title: &str,
        description: &str,
        category_slugs: &[String],
    ) -> Result<RewriteOutput> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(title, description, category_slugs)),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Rewriter(format!(
                "API error {}: {}",
                status,
                truncate_chars(&error_text, 300)
            )));
        }

        let body: GenerateResponse = response.json().await?;

        let text = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");

        parse_reply(&text)
    }
}

fn build_prompt(title: &str, description: &str, category_slugs: &[String]) -> String {
    format!(
        r#"நீங்கள் ஒரு அனுபவம் வாய்ந்த தமிழ் செய்தி ஆசிரியர். கீழே உள்ள செய்தியை உங்கள் சொந்த நடையில், தெளிவான தமிழில் மீண்டும் எழுதுங்கள்.

மூல தலைப்பு: {title}
மூல உள்ளடக்கம்: {description}

வழிமுறைகள்:
1. தலைப்பை 80 எழுத்துகளுக்குள் சுருக்கமாக மாற்றி எழுதுங்கள்.
2. உள்ளடக்கத்தை 200 முதல் 300 சொற்களில், 3 அல்லது 4 பத்திகளாக எழுதுங்கள். ஒவ்வொரு பத்திக்கும் இடையே இரண்டு புதிய வரிகள் (\n\n) இருக்க வேண்டும்.
3. 160 எழுத்துகளுக்குள் ஒரு சுருக்கம் எழுதுங்கள்.
4. பின்வரும் பிரிவுகளில் ஒன்றை மட்டுமே தேர்ந்தெடுங்கள்: {categories}

பதிலை கீழ்க்கண்ட JSON வடிவில் மட்டும் தாருங்கள், வேறு எந்த விளக்கமும் வேண்டாம்:
{{"title": "...", "content": "...", "excerpt": "...", "category": "..."}}"#,
        title = title,
        description = description,
        categories = category_slugs.join(", "),
    )
}

/// Pull the rewrite out of free text that should contain one JSON object.
pub fn parse_reply(text: &str) -> Result<RewriteOutput> {
    let json = first_json_object(text)
        .ok_or_else(|| AppError::Rewriter("no JSON object in model reply".to_string()))?;

    let reply: ModelReply = serde_json::from_str(json)
        .map_err(|e| AppError::Rewriter(format!("unparsable model reply: {}", e)))?;

    let field = |value: Option<String>, name: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Rewriter(format!("model reply missing {}", name)))
    };

    Ok(RewriteOutput {
        title: field(reply.title, "title")?,
        content: field(reply.content, "content")?,
        excerpt: truncate_chars(&field(reply.excerpt, "excerpt")?, MAX_EXCERPT_CHARS),
        category_slug: field(reply.category, "category")?.to_lowercase(),
    })
}

/// First balanced `{...}` in `text`, ignoring braces inside string literals.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
