use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::http::handlers;
use crate::http::middleware::headers;
use crate::AppState;

/// Generous transport-level cap; the upload handler enforces the real limit
/// so oversized files get the human-readable validation message instead of a
/// bare 413.
const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn api() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/api/images", get(handlers::list_images))
        .route("/api/img/:short_id", get(handlers::redirect_short))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(middleware::from_fn(headers::no_store))
        .layer(CorsLayer::permissive())
}

pub fn viewer() -> Router<AppState> {
    Router::new()
        .route("/img/:short_id", get(handlers::view_page))
        .layer(middleware::from_fn(headers::preview_headers))
}
