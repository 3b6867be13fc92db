use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use webmention_receiver::WebmentionReceiver;

pub mod rest;

pub struct AppState {
    pub receiver: Arc<WebmentionReceiver>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(|| async { "ok" }))
        // Public endpoints
        .route(
            "/webmention",
            axum::routing::post(rest::webmention::api_submit),
        )
        .route("/webmentions", get(rest::webmention::api_webmentions))
        // Token-guarded administration
        .route("/cleanup", get(rest::admin::api_cleanup))
        .route("/import", get(rest::admin::api_import))
        .with_state(state)
        // Webmentions arrive from any origin
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only (query strings carry tokens)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
