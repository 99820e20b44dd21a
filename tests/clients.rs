//! Outbound HTTP clients against local stand-in providers.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use common::spawn_server;
use seithi::ai::{GeminiRewriter, Rewriter};
use seithi::feed::{FeedSource, HttpFeedFetcher, MAX_FEED_BYTES};
use seithi::services::{Mailer, OutgoingEmail, Relay, ResendMailer, WebhookPayload, WebhookRelay};
use seithi::AppError;

type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

async fn capture(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorised = headers
        .get("x-webhook-key")
        .map(|v| v == "s3cret")
        .unwrap_or(false)
        || headers
            .get("authorization")
            .map(|v| v == "Bearer re_test")
            .unwrap_or(false);
    captured.lock().unwrap().push((headers, body));

    if authorised {
        (StatusCode::OK, Json(json!({ "id": "ok-1" })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })))
    }
}

async fn capture_server() -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/hook", post(capture))
        .route("/emails", post(capture))
        .with_state(captured.clone());
    (spawn_server(router).await, captured)
}

fn payload() -> WebhookPayload {
    WebhookPayload {
        article_id: 7,
        title: "தலைப்பு".to_string(),
        excerpt: "சுருக்கம்".to_string(),
        image_url: None,
        article_url: "https://seithi.test/article/x-1234abcd".to_string(),
        category: Some("அரசியல்".to_string()),
        category_slug: Some("politics".to_string()),
        publish_date: Some("2024-01-01T10:00:00Z".to_string()),
        source_name: Some("Partner".to_string()),
        action: "facebook_post".to_string(),
    }
}

#[tokio::test]
async fn test_webhook_relay_sends_shared_secret() {
    let (base, captured) = capture_server().await;
    let relay = WebhookRelay::new(format!("{}/hook", base), "s3cret".to_string()).unwrap();

    let response = relay.deliver(&payload()).await.unwrap();
    assert!(response.is_success());

    let captured = captured.lock().unwrap();
    let (headers, body) = &captured[0];
    assert_eq!(headers.get("x-webhook-key").unwrap(), "s3cret");
    assert_eq!(body["article_id"], 7);
    assert_eq!(body["action"], "facebook_post");
    assert_eq!(body["category_slug"], "politics");
}

#[tokio::test]
async fn test_webhook_relay_reports_http_failure_as_response() {
    let (base, _captured) = capture_server().await;
    let relay = WebhookRelay::new(format!("{}/hook", base), "wrong".to_string()).unwrap();

    let response = relay.deliver(&payload()).await.unwrap();
    assert_eq!(response.status, 401);
    assert!(!response.is_success());
    assert!(response.body.contains("bad key"));
}

#[tokio::test]
async fn test_resend_mailer_posts_json_with_bearer_key() {
    let (base, captured) = capture_server().await;
    let mailer = ResendMailer::new(
        "re_test".to_string(),
        base.clone(),
        "alerts@seithi.test".to_string(),
    )
    .unwrap();

    mailer
        .send(&OutgoingEmail {
            to: vec!["ops@seithi.test".to_string()],
            subject: "Pipeline alert".to_string(),
            html: "<p>stale</p>".to_string(),
        })
        .await
        .unwrap();

    let captured = captured.lock().unwrap();
    let (_, body) = &captured[0];
    assert_eq!(body["from"], "alerts@seithi.test");
    assert_eq!(body["to"], json!(["ops@seithi.test"]));
    assert_eq!(body["subject"], "Pipeline alert");

    drop(captured);
    let bad = ResendMailer::new("nope".to_string(), base, "a@b".to_string()).unwrap();
    let err = bad
        .send(&OutgoingEmail {
            to: vec!["ops@seithi.test".to_string()],
            subject: "s".to_string(),
            html: "h".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Mail(_)));
}

#[tokio::test]
async fn test_http_feed_fetcher() {
    let router = Router::new().route(
        "/rss",
        get(|| async { "<rss><channel><item><title>x</title></item></channel></rss>" }),
    );
    let base = spawn_server(router).await;
    let fetcher = HttpFeedFetcher::new().unwrap();

    let body = fetcher.fetch(&format!("{}/rss", base)).await.unwrap();
    assert!(body.contains("<item>"));

    let err = fetcher.fetch(&format!("{}/missing", base)).await.unwrap_err();
    assert!(matches!(err, AppError::Feed(_)));
}

#[tokio::test]
async fn test_http_feed_fetcher_honours_charset_and_size_cap() {
    let router = Router::new()
        .route(
            "/latin1",
            get(|| async {
                let mut body = b"<rss><item><title>Caf".to_vec();
                body.extend_from_slice(&[0xE9]);
                body.extend_from_slice(b"</title></item></rss>");
                ([(CONTENT_TYPE, "application/rss+xml; charset=iso-8859-1")], body)
            }),
        )
        .route("/huge", get(|| async { vec![b' '; MAX_FEED_BYTES + 1] }));
    let base = spawn_server(router).await;
    let fetcher = HttpFeedFetcher::new().unwrap();

    let body = fetcher.fetch(&format!("{}/latin1", base)).await.unwrap();
    assert!(body.contains("<title>Café</title>"));

    match fetcher.fetch(&format!("{}/huge", base)).await {
        Err(AppError::Feed(msg)) => assert!(msg.contains("too large")),
        other => panic!("expected a size error, got {:?}", other.map(|b| b.len())),
    }
}

async fn generate(
    Path(call): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if query.get("key").map(String::as_str) != Some("g-key") {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "bad key" })));
    }
    assert_eq!(call, "gemini-test:generateContent");
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    assert!(prompt.contains("national, sports"));

    let reply = "```json\n{\"title\": \"புதிய தலைப்பு\", \"content\": \"ஒன்று\\n\\nஇரண்டு\", \
                 \"excerpt\": \"சுருக்கம்\", \"category\": \"Sports\"}\n```";
    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
        })),
    )
}

#[tokio::test]
async fn test_gemini_rewriter_parses_fenced_reply() {
    let router = Router::new().route("/models/:call", post(generate));
    let base = spawn_server(router).await;
    let categories = vec!["national".to_string(), "sports".to_string()];

    let rewriter =
        GeminiRewriter::new("g-key".to_string(), base.clone(), "gemini-test".to_string()).unwrap();
    let out = rewriter.rewrite("Title", "Body", &categories).await.unwrap();
    assert_eq!(out.title, "புதிய தலைப்பு");
    assert_eq!(out.content, "ஒன்று\n\nஇரண்டு");
    assert_eq!(out.category_slug, "sports");

    let denied =
        GeminiRewriter::new("other".to_string(), base, "gemini-test".to_string()).unwrap();
    assert!(matches!(
        denied.rewrite("Title", "Body", &categories).await,
        Err(AppError::Rewriter(_))
    ));
}
