//! Shared test helpers for server integration tests.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use arstage_server::build_router;

/// A temporary static directory with a small site in it.
pub struct TestSite {
    /// Keeps the directory alive for the test's duration.
    pub dir: TempDir,
    /// Router serving `dir`.
    pub router: Router,
}

/// Buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// The `Content-Type` header, or an empty string.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

impl TestSite {
    /// Lay out an index page, a script and two model files.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("assets/models")).expect("mkdir models");
        std::fs::create_dir_all(root.join("assets/markers")).expect("mkdir markers");
        std::fs::create_dir_all(root.join("js")).expect("mkdir js");

        std::fs::write(root.join("index.html"), "<html><body>AR</body></html>").expect("index");
        std::fs::write(root.join("js/app.js"), "console.log('ar');").expect("script");
        std::fs::write(root.join("assets/models/model.usdz"), b"PK\x03\x04usdz").expect("usdz");
        std::fs::write(root.join("assets/models/model.glb"), b"glTF\x02\x00\x00\x00").expect("glb");
        std::fs::write(root.join("assets/markers/target.mind"), [0u8, 1, 2, 3]).expect("mind");

        let router = build_router(root);
        Self { dir, router }
    }

    /// Send a GET through the router.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
