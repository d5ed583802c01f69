//! Rewriting and metadata endpoint integration tests.
//!
//! Run with: `cargo test -p stageproxy-api --test rewrite_test`

mod helpers;

use helpers::fixtures;
use helpers::{setup_test_app, setup_test_app_with, LOCAL_BASE_URL};
use serde_json::json;
use stageproxy_core::ProxyMode;

const ORIGIN: &str = "https://prod.example.com";

fn origin() -> Option<String> {
    Some(ORIGIN.to_string())
}

#[tokio::test]
async fn test_health_reports_mode_and_origin() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "download");
    assert_eq!(body["origin_configured"], true);
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_health_is_degraded_without_required_origin() {
    let app = setup_test_app(ProxyMode::Redirect, None).await;

    let body: serde_json::Value = app.client().get("/health").await.json();

    assert_eq!(body["status"], "degraded");
    assert_eq!(body["origin_configured"], false);
}

#[tokio::test]
async fn test_rewrite_content_points_missing_images_at_origin() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;
    app.put_upload("2023/01/here.jpg", b"local");

    let content = format!(
        r#"<p><img src="{base}/2024/05/gone.jpg" alt="x"><img src="{base}/2023/01/here.jpg"></p>"#,
        base = LOCAL_BASE_URL
    );
    let response = app
        .client()
        .post("/rewrite/content")
        .json(&json!({ "content": content, "context": "front" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    let rewritten = body["content"].as_str().unwrap();
    assert!(rewritten.contains(&format!(r#"src="{}/wp-content/uploads/2024/05/gone.jpg""#, ORIGIN)));
    assert!(rewritten.contains(&format!(r#"src="{}/2023/01/here.jpg""#, LOCAL_BASE_URL)));
}

#[tokio::test]
async fn test_rewrite_content_leaves_admin_context_alone() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;
    let content = format!(r#"<img src="{}/2024/05/gone.jpg">"#, LOCAL_BASE_URL);

    let body: serde_json::Value = app
        .client()
        .post("/rewrite/content")
        .json(&json!({ "content": content, "context": "admin" }))
        .await
        .json();

    assert_eq!(body["content"], content);
}

#[tokio::test]
async fn test_rewrite_content_without_srcset_synthesis() {
    let app = setup_test_app_with(ProxyMode::Download, origin(), |config| {
        config.synthesize_srcset = false
    })
    .await;
    let content = format!(r#"<img src="{}/2024/05/gone.jpg">"#, LOCAL_BASE_URL);

    let body: serde_json::Value = app
        .client()
        .post("/rewrite/content")
        .json(&json!({ "content": content }))
        .await
        .json();

    let rewritten = body["content"].as_str().unwrap();
    assert!(rewritten.contains(ORIGIN));
    assert!(!rewritten.contains("srcset"));
}

#[tokio::test]
async fn test_rewrite_content_rejects_malformed_body() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;

    let response = app
        .client()
        .post("/rewrite/content")
        .json(&json!({ "context": "front" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_rewrite_attachment_url() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;
    app.put_upload("2023/01/here.pdf", b"%PDF");

    let missing: serde_json::Value = app
        .client()
        .post("/rewrite/attachment-url")
        .json(&json!({ "url": format!("{}/2024/05/doc.pdf?v=2", LOCAL_BASE_URL) }))
        .await
        .json();
    assert_eq!(
        missing["url"],
        format!("{}/wp-content/uploads/2024/05/doc.pdf?v=2", ORIGIN)
    );

    let present: serde_json::Value = app
        .client()
        .post("/rewrite/attachment-url")
        .json(&json!({ "url": format!("{}/2023/01/here.pdf", LOCAL_BASE_URL) }))
        .await
        .json();
    assert_eq!(present["url"], format!("{}/2023/01/here.pdf", LOCAL_BASE_URL));
}

#[tokio::test]
async fn test_rewrite_image_src_backfills_dimensions() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;

    let body: serde_json::Value = app
        .client()
        .post("/rewrite/image-src")
        .json(&json!({
            "url": format!("{}/2024/05/gone.jpg", LOCAL_BASE_URL),
            "metadata": { "width": 640, "height": 480, "file": "2024/05/gone.jpg" }
        }))
        .await
        .json();

    assert_eq!(body["url"], format!("{}/wp-content/uploads/2024/05/gone.jpg", ORIGIN));
    assert_eq!(body["width"], 640);
    assert_eq!(body["height"], 480);
    assert_eq!(body["intermediate"], true);
}

#[tokio::test]
async fn test_remote_srcset_adds_registered_sizes() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;

    let body: serde_json::Value = app
        .client()
        .post("/rewrite/srcset")
        .json(&json!({
            "image_src": format!("{}/2024/05/beach.jpg", LOCAL_BASE_URL),
            "metadata": { "width": 1200, "height": 800, "file": "2024/05/beach.jpg" }
        }))
        .await
        .json();

    let sources = body["sources"].as_object().unwrap();
    assert_eq!(
        sources["300"]["url"],
        format!("{}/wp-content/uploads/2024/05/beach-300x200.jpg", ORIGIN)
    );
    assert_eq!(sources["150"]["descriptor"], "w");
    assert_eq!(sources["1024"]["value"], 1024);
}

#[tokio::test]
async fn test_synthesize_sizes_endpoint() {
    let app = setup_test_app(ProxyMode::Download, origin()).await;

    let body: serde_json::Value = app
        .client()
        .post("/metadata/sizes")
        .json(&json!({ "width": 1200, "height": 800, "file": "2024/05/beach.jpg" }))
        .await
        .json();

    assert_eq!(body["sizes"]["thumbnail"]["file"], "beach-r-150x150c.jpg");
    assert_eq!(body["sizes"]["medium"]["file"], "beach-r-300x200.jpg");
}

#[tokio::test]
async fn test_remote_metadata_reads_dimensions_from_origin() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/wp-content/uploads/2024/05/remote.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .create_async()
        .await;
    let get = server
        .mock("GET", "/wp-content/uploads/2024/05/remote.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(fixtures::png(64, 48, [7, 7, 7]))
        .create_async()
        .await;

    let app = setup_test_app(ProxyMode::Download, Some(server.url())).await;

    let body: serde_json::Value = app
        .client()
        .post("/metadata/remote")
        .json(&json!({ "url": format!("{}/2024/05/remote.png", LOCAL_BASE_URL) }))
        .await
        .json();

    assert_eq!(body["metadata"]["width"], 64);
    assert_eq!(body["metadata"]["height"], 48);
    assert_eq!(body["metadata"]["file"], "2024/05/remote.png");

    head.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn test_remote_metadata_ignores_non_images() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/wp-content/uploads/2024/05/notes.txt")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .create_async()
        .await;

    let app = setup_test_app(ProxyMode::Download, Some(server.url())).await;

    let body: serde_json::Value = app
        .client()
        .post("/metadata/remote")
        .json(&json!({ "url": format!("{}/2024/05/notes.txt", LOCAL_BASE_URL) }))
        .await
        .json();

    assert!(body["metadata"].is_null());
}
