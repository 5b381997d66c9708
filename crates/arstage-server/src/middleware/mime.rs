//! Content types for AR assets.
//!
//! Quick Look on iOS only opens `.usdz` served as `model/vnd.usdz+zip`, and
//! some WebXR loaders reject `.glb` without `model/gltf-binary`.

use std::path::Path;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::Response;

/// Extension to content type overrides.
pub const AR_CONTENT_TYPES: &[(&str, &str)] = &[
    ("usdz", "model/vnd.usdz+zip"),
    ("glb", "model/gltf-binary"),
    ("gltf", "model/gltf+json"),
    ("mind", "application/octet-stream"),
];

/// Content type override for a request path, if it names an AR asset.
pub fn ar_content_type_for(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    AR_CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Rewrites `Content-Type` on successful responses for AR assets.
pub async fn ar_content_type(request: Request, next: Next) -> Response {
    let content_type = ar_content_type_for(request.uri().path());
    let mut response = next.run(request).await;

    if let Some(content_type) = content_type {
        if response.status().is_success() {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
    response
}
