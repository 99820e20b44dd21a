use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    activate_source, alert_logs, deactivate_source, fetch_logs, fetch_rss, health, health_check,
    list_articles, post_logs, post_to_facebook, post_to_facebook_bulk, publish_article,
    record_view, reject_article, AppState,
};

pub fn create_router(app: AppState, cors_origins: &[String]) -> Router {
    let article_routes = Router::new()
        .route("/", get(list_articles))
        .route("/:id/post-logs", get(post_logs))
        .route("/:id/publish", post(publish_article))
        .route("/:id/reject", post(reject_article))
        .route("/:id/view", post(record_view));

    Router::new()
        .route("/fetch-rss", post(fetch_rss))
        .route("/health-check", post(health_check))
        .route("/post-to-facebook", post(post_to_facebook))
        .route("/post-to-facebook/bulk", post(post_to_facebook_bulk))
        .route("/fetch-logs", get(fetch_logs))
        .route("/alert-logs", get(alert_logs))
        .route("/sources/:id/activate", post(activate_source))
        .route("/sources/:id/deactivate", post(deactivate_source))
        .nest("/articles", article_routes)
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(app)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed)
    }
}
