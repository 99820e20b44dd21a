//! HTTP API tests against the router with in-memory storage.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use common::{test_app, CountingRelay, EchoRewriter};
use seithi::ai::Rewriter;
use seithi::services::Relay;
use seithi::web::create_router;

async fn server_with(relay: Option<Arc<CountingRelay>>) -> TestServer {
    let rewriter: Arc<dyn Rewriter> = Arc::new(EchoRewriter);
    let relay = relay.map(|r| r as Arc<dyn Relay>);
    let app = test_app(Some(rewriter), relay).await;
    TestServer::new(create_router(app, &[])).expect("Failed to create test server")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = server_with(None).await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_fetch_twice_dedups_by_original_url() {
    let server = server_with(None).await;

    let first = server.post("/fetch-rss").await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body["processed"], 1);
    assert_eq!(body["skipped"], 0);
    assert!(body.get("errors").is_none());

    let second: Value = server.post("/fetch-rss").await.json();
    assert_eq!(second["processed"], 0);
    assert_eq!(second["skipped"], 1);

    let logs: Value = server.get("/fetch-logs").add_query_param("limit", 5).await.json();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["status"], "success");
    assert_eq!(logs[0]["items_skipped"], 1);
}

#[tokio::test]
async fn test_fetch_without_rewriter_is_server_error() {
    let app = test_app(None, None).await;
    let server = TestServer::new(create_router(app, &[])).unwrap();

    let response = server.post("/fetch-rss").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn test_publish_auto_posts_once() {
    let relay = Arc::new(CountingRelay::with_status(200));
    let server = server_with(Some(relay.clone())).await;
    server.post("/fetch-rss").await.assert_status_ok();

    let published: Value = server.post("/articles/1/publish").await.json();
    assert_eq!(published["article"]["status"], "published");
    assert!(published["article"]["publish_date"].is_string());
    assert_eq!(published["facebook"]["outcome"], "posted");
    assert_eq!(published["article"]["posted_to_facebook"], true);

    let again = server
        .post("/post-to-facebook")
        .json(&json!({ "article_id": 1 }))
        .await;
    again.assert_status_ok();
    let body: Value = again.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["already_posted"], true);
    assert_eq!(body["log_id"], published["facebook"]["log_id"]);

    assert_eq!(relay.call_count(), 1);
    let payload = relay.payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.action, "facebook_post");
    assert_eq!(payload.source_name.as_deref(), Some("Partner"));
    assert_eq!(payload.image_url.as_deref(), Some("https://partner.test/a1.jpg"));
    assert!(payload.article_url.starts_with("https://seithi.test/article/"));
}

#[tokio::test]
async fn test_post_to_facebook_errors() {
    let relay = Arc::new(CountingRelay::with_status(502));
    let server = server_with(Some(relay)).await;
    server.post("/fetch-rss").await.assert_status_ok();

    server
        .post("/post-to-facebook")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/post-to-facebook")
        .json(&json!({ "article_id": 999 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let failed = server
        .post("/post-to-facebook")
        .json(&json!({ "article_id": 1 }))
        .await;
    failed.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = failed.json();
    assert!(body["log_id"].is_i64());
    assert!(body["error"].as_str().unwrap().contains("502"));
}

#[tokio::test]
async fn test_post_without_relay_is_misconfigured() {
    let server = server_with(None).await;
    server.post("/fetch-rss").await.assert_status_ok();

    let response = server
        .post("/post-to-facebook")
        .json(&json!({ "article_id": 1 }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["log_id"].is_i64());
}

#[tokio::test]
async fn test_bulk_post_reports_each_article() {
    let relay = Arc::new(CountingRelay::with_status(200));
    let server = server_with(Some(relay)).await;
    server.post("/fetch-rss").await.assert_status_ok();

    let response = server
        .post("/post-to-facebook/bulk")
        .json(&json!({ "article_ids": [1, 42] }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["posted"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["article_id"], 42);
    assert_eq!(body["results"][1]["success"], false);

    server
        .post("/post-to-facebook/bulk")
        .json(&json!({ "article_ids": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_moderation_round_trip() {
    let server = server_with(None).await;
    server.post("/fetch-rss").await.assert_status_ok();

    let rejected: Value = server.post("/articles/1/reject").await.json();
    assert_eq!(rejected["article"]["status"], "rejected");
    assert!(rejected["article"]["publish_date"].is_null());

    server
        .post("/articles/1/reject")
        .await
        .assert_status(StatusCode::CONFLICT);

    let view: Value = server.post("/articles/1/view").await.json();
    assert_eq!(view["view_count"], 1);

    server
        .post("/articles/77/view")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check_on_empty_history() {
    let server = server_with(None).await;

    let report: Value = server.post("/health-check").await.json();
    assert_eq!(report["status"], "unhealthy");
    let issues: Vec<&str> = report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(issues, vec!["no_fetch_logs", "no_recent_articles"]);
}

#[tokio::test]
async fn test_listings_and_source_toggle() {
    let relay = Arc::new(CountingRelay::with_status(200));
    let server = server_with(Some(relay)).await;
    server.post("/fetch-rss").await.assert_status_ok();

    let pending: Value = server.get("/articles").await.json();
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["title"], "PM Announces Policy (rewritten)");

    server.post("/articles/1/publish").await.assert_status_ok();
    let published: Value = server
        .get("/articles")
        .add_query_param("status", "published")
        .await
        .json();
    assert_eq!(published[0]["id"], 1);
    server
        .get("/articles")
        .add_query_param("status", "archived")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let logs: Value = server.get("/articles/1/post-logs").await.json();
    assert_eq!(logs[0]["status"], "success");
    server
        .get("/articles/9/post-logs")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let alerts: Value = server.get("/alert-logs").await.json();
    assert!(alerts.as_array().unwrap().is_empty());

    let off: Value = server.post("/sources/1/deactivate").await.json();
    assert_eq!(off["is_active"], false);
    let run: Value = server.post("/fetch-rss").await.json();
    assert_eq!(run["processed"], 0);
    assert_eq!(run["skipped"], 0);

    server.post("/sources/1/activate").await.assert_status_ok();
    server
        .post("/sources/5/deactivate")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
