//! Route definitions for the static server.
//!
//! There is no routing logic: every request falls through to the static
//! directory. Directories resolve to their `index.html`.

use std::path::Path;

use axum::{Router, middleware as axum_middleware};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware;

/// Build the router serving `static_dir`.
pub fn build_router(static_dir: impl AsRef<Path>) -> Router {
    let static_files = ServeDir::new(static_dir.as_ref()).append_index_html_on_directories(true);

    Router::new()
        .fallback_service(static_files)
        .layer(axum_middleware::from_fn(middleware::mime::ar_content_type))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
}
