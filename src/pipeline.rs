//! Request pipeline composition.
//!
//! The served router is the static file service wrapped in the optional
//! steps enabled by the configuration. Steps are listed innermost first and
//! folded onto the router, so the last step applied is the outermost:
//!
//! ```text
//! logging -> custom headers -> compression -> static files
//! ```

use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CustomHeaders, ServeConfig};
use crate::http::static_files::create_static_service;
use crate::middleware::access_log_layer;

/// One optional behaviour wrapped around the static file service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStep {
    /// Gzip response bodies for clients that accept it
    Compression,
    /// Set each header on every response
    CustomHeaders(CustomHeaders),
    /// Log method and path of each request
    Logging,
}

impl PipelineStep {
    fn apply(self, router: Router) -> Router {
        match self {
            PipelineStep::Compression => router.layer(CompressionLayer::new()),
            PipelineStep::CustomHeaders(headers) => {
                headers.iter().fold(router, |router, (name, value)| {
                    router.layer(SetResponseHeaderLayer::overriding(
                        name.clone(),
                        value.clone(),
                    ))
                })
            }
            PipelineStep::Logging => router.layer(middleware::from_fn(access_log_layer)),
        }
    }
}

/// The enabled steps, innermost first.
pub fn steps(config: &ServeConfig) -> Vec<PipelineStep> {
    let mut steps = Vec::new();
    if config.gzip {
        steps.push(PipelineStep::Compression);
    }
    if !config.headers.is_empty() {
        steps.push(PipelineStep::CustomHeaders(config.headers.clone()));
    }
    if config.logging {
        steps.push(PipelineStep::Logging);
    }
    steps
}

/// Build the router serving `config.root` with every enabled step applied.
pub fn compose(config: &ServeConfig) -> Router {
    let base = Router::new().fallback_service(create_static_service(&config.root));

    steps(config)
        .into_iter()
        .fold(base, |router, step| step.apply(router))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    const PAGE: &str = "<!DOCTYPE html><html><body><h1>Hello from serve</h1><p>Enough text to \
                        be worth compressing, repeated. Enough text to be worth compressing, \
                        repeated.</p></body></html>";

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), PAGE).unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"ok":true}"#).unwrap();
        dir
    }

    fn config(root: &Path) -> ServeConfig {
        ServeConfig::for_root(root)
    }

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_steps_are_innermost_first() {
        let mut config = config(Path::new("."));
        config.gzip = true;
        config.logging = true;
        config.headers = CustomHeaders::parse(&["X-A: 1"]).unwrap();

        let steps = steps(&config);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], PipelineStep::Compression);
        assert!(matches!(steps[1], PipelineStep::CustomHeaders(_)));
        assert_eq!(steps[2], PipelineStep::Logging);
    }

    #[test]
    fn test_no_options_no_steps() {
        assert!(steps(&config(Path::new("."))).is_empty());
    }

    #[tokio::test]
    async fn test_plain_pipeline_matches_static_service() {
        let dir = site();
        let app = compose(&config(dir.path()));

        for path in ["/index.html", "/", "/data.json", "/missing"] {
            let composed = app.clone().oneshot(get(path)).await.unwrap();
            let base = create_static_service(dir.path())
                .oneshot(get(path))
                .await
                .unwrap();

            assert_eq!(composed.status(), base.status(), "status for {path}");
            assert_eq!(
                composed.headers().get(CONTENT_TYPE),
                base.headers().get(CONTENT_TYPE),
                "content type for {path}"
            );
            let composed = composed.into_body().collect().await.unwrap().to_bytes();
            let base = base.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(composed, base, "body for {path}");
        }
    }

    #[tokio::test]
    async fn test_custom_headers_on_every_response() {
        let dir = site();
        let mut config = config(dir.path());
        config.headers =
            CustomHeaders::parse(&["X-Served-By: serve", "Cache-Control: no-store"]).unwrap();
        let app = compose(&config);

        for path in ["/index.html", "/data.json", "/missing"] {
            let response = app.clone().oneshot(get(path)).await.unwrap();
            assert_eq!(response.headers()["x-served-by"], "serve", "{path}");
            assert_eq!(response.headers()["cache-control"], "no-store", "{path}");
        }
    }

    #[tokio::test]
    async fn test_custom_header_overrides_content_type() {
        let dir = site();
        let mut config = config(dir.path());
        config.headers = CustomHeaders::parse(&["Content-Type: text/plain"]).unwrap();

        let response = compose(&config).oneshot(get("/index.html")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_gzip_when_accepted() {
        let dir = site();
        let mut config = config(dir.path());
        config.gzip = true;
        let app = compose(&config);

        let request = Request::get("/index.html")
            .header(ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");

        let response = app.oneshot(get("/index.html")).await.unwrap();
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, PAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_logging_records_method_and_path() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = site();
        let mut config = config(dir.path());
        config.logging = true;

        let response = compose(&config)
            .oneshot(get("/index.html?v=2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(logs.contents().contains("GET /index.html?v=2"));
    }

    #[tokio::test]
    async fn test_logging_off_is_silent() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = site();
        compose(&config(dir.path()))
            .oneshot(get("/index.html"))
            .await
            .unwrap();
        assert!(!logs.contents().contains("GET /index.html"));
    }
}
