use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

/// The map page at `/` and its assets under `/static`.
pub fn routes(static_dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
}
