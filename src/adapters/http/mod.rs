//! HTTP adapters - REST API implementations.
//!
//! `api_router` mounts the merge endpoints plus a health check, wrapped in
//! request tracing and a request timeout.

pub mod merge;

use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use merge::{merge_routes, MergeHandlers};

/// Builds the full HTTP application.
pub fn api_router(handlers: MergeHandlers, request_timeout: Duration) -> Router {
    merge_routes(handlers)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

async fn health() -> &'static str {
    "ok"
}
