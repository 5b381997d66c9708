//! Integration tests for static file routing.

mod helpers;

use axum::http::StatusCode;

#[tokio::test]
async fn test_serves_file_contents() {
    let site = helpers::TestSite::new();

    let response = site.get("/js/app.js").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"console.log('ar');");
    assert!(response.content_type().contains("javascript"));
}

#[tokio::test]
async fn test_root_resolves_to_index() {
    let site = helpers::TestSite::new();

    let response = site.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type().starts_with("text/html"));
    assert!(String::from_utf8_lossy(&response.body).contains("AR"));
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let site = helpers::TestSite::new();

    let response = site.get("/assets/models/absent.glb").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_model_content_types() {
    let site = helpers::TestSite::new();

    let usdz = site.get("/assets/models/model.usdz").await;
    assert_eq!(usdz.status, StatusCode::OK);
    assert_eq!(usdz.content_type(), "model/vnd.usdz+zip");

    let glb = site.get("/assets/models/model.glb").await;
    assert_eq!(glb.content_type(), "model/gltf-binary");

    let marker = site.get("/assets/markers/target.mind").await;
    assert_eq!(marker.content_type(), "application/octet-stream");
    assert_eq!(marker.body, vec![0u8, 1, 2, 3]);
}

#[tokio::test]
async fn test_parent_traversal_is_rejected() {
    let site = helpers::TestSite::new();

    let response = site.get("/../../etc/hostname").await;

    assert_ne!(response.status, StatusCode::OK);
}
