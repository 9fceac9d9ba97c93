//! Base static file service.
//!
//! Serves the configured root directory. `index.html` is appended to
//! directory requests; range requests, conditional GETs and content types
//! are handled by `ServeDir`.

use std::path::Path;

use tower_http::services::ServeDir;

/// Create the static file service for `root`.
pub fn create_static_service(root: &Path) -> ServeDir {
    ServeDir::new(root).append_index_html_on_directories(true)
}
