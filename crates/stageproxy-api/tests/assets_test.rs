//! Uploads request integration tests.
//!
//! Run with: `cargo test -p stageproxy-api --test assets_test`

mod helpers;

use helpers::fixtures;
use helpers::setup_test_app;
use stageproxy_core::ProxyMode;

#[tokio::test]
async fn test_redirect_mode_sends_location_and_writes_nothing() {
    let app = setup_test_app(ProxyMode::Redirect, Some("https://prod.example.com".to_string())).await;

    let response = app
        .client()
        .get("/wp-content/uploads/2024/05/beach-300x200.jpg")
        .await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(
        response.header("location"),
        "https://prod.example.com/wp-content/uploads/2024/05/beach-300x200.jpg"
    );
    assert!(!app.uploads_dir().join("2024").exists());
}

#[tokio::test]
async fn test_redirect_mode_without_origin_is_a_configuration_error() {
    let app = setup_test_app(ProxyMode::Redirect, None).await;

    let response = app.client().get("/wp-content/uploads/2024/05/a.jpg").await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert!(body["code"].is_string());
}

#[tokio::test]
async fn test_download_mode_fetches_original_once_and_serves_resize() {
    let mut origin = mockito::Server::new_async().await;
    let original = origin
        .mock("GET", "/wp-content/uploads/2024/05/photo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(fixtures::png(600, 400, [200, 40, 40]))
        .expect(1)
        .create_async()
        .await;

    let app = setup_test_app(ProxyMode::Download, Some(origin.url())).await;

    let response = app
        .client()
        .get("/wp-content/uploads/2024/05/photo-300x200.png")
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(fixtures::dimensions(response.as_bytes()), (300, 200));

    assert!(app.uploads_dir().join("2024/05/photo.png").is_file());
    assert!(app.uploads_dir().join("2024/05/photo-300x200.png").is_file());

    // Both files are now local: the second request never reaches the origin.
    let again = app
        .client()
        .get("/wp-content/uploads/2024/05/photo-300x200.png")
        .await;
    assert_eq!(again.status_code(), 200);

    original.assert_async().await;
}

#[tokio::test]
async fn test_download_mode_origin_failure_is_bad_gateway() {
    let mut origin = mockito::Server::new_async().await;
    let _missing = origin
        .mock("GET", "/wp-content/uploads/2024/05/gone.jpg")
        .with_status(404)
        .create_async()
        .await;

    let app = setup_test_app(ProxyMode::Download, Some(origin.url())).await;

    let response = app.client().get("/wp-content/uploads/2024/05/gone.jpg").await;

    assert_eq!(response.status_code(), 502);
    assert!(!app.uploads_dir().join("2024/05/gone.jpg").exists());
}

#[tokio::test]
async fn test_placeholder_mode_redirects_with_requested_dimensions() {
    let mut origin = mockito::Server::new_async().await;
    let _missing = origin
        .mock("GET", "/wp-content/uploads/2024/05/photo.jpg")
        .with_status(500)
        .create_async()
        .await;

    let app = setup_test_app(ProxyMode::Placeholder, Some(origin.url())).await;

    let response = app
        .client()
        .get("/wp-content/uploads/2024/05/photo-320x240.jpg")
        .await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(response.header("location"), "http://lorempixel.com/320/240");
}

#[tokio::test]
async fn test_photon_mode_redirects_to_transform_query() {
    let app = setup_test_app(ProxyMode::Photon, Some("https://prod.example.com".to_string())).await;

    let response = app
        .client()
        .get("/wp-content/uploads/2024/05/photo-150x150c.jpg")
        .await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(
        response.header("location"),
        "https://prod.example.com/wp-content/uploads/2024/05/photo.jpg?w=150&h=150&resize=150,150"
    );
}

#[tokio::test]
async fn test_local_fallback_is_consistent_per_uri() {
    let app = setup_test_app(ProxyMode::LocalFallback, None).await;
    std::fs::create_dir_all(app.pool_dir()).unwrap();
    std::fs::write(app.pool_dir().join("a.png"), fixtures::png(40, 40, [255, 0, 0])).unwrap();
    std::fs::write(app.pool_dir().join("b.png"), fixtures::png(40, 40, [0, 0, 255])).unwrap();
    std::fs::write(app.pool_dir().join("c.png"), fixtures::png(40, 40, [0, 255, 0])).unwrap();

    let first = app.client().get("/wp-content/uploads/2024/05/missing.png").await;
    assert_eq!(first.status_code(), 200);

    for _ in 0..5 {
        let again = app.client().get("/wp-content/uploads/2024/05/missing.png").await;
        assert_eq!(again.status_code(), 200);
        assert_eq!(again.as_bytes(), first.as_bytes());
    }

    // Fallback files are served, never copied into the uploads tree.
    assert!(!app.uploads_dir().join("2024/05/missing.png").exists());
}

#[tokio::test]
async fn test_local_fallback_resizes_substitute() {
    let app = setup_test_app(ProxyMode::LocalFallback, None).await;
    std::fs::create_dir_all(app.pool_dir()).unwrap();
    std::fs::write(app.pool_dir().join("only.png"), fixtures::png(200, 100, [9, 9, 9])).unwrap();

    let response = app
        .client()
        .get("/wp-content/uploads/2024/05/missing-50x50c.png")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(fixtures::dimensions(response.as_bytes()), (50, 50));
}

#[tokio::test]
async fn test_local_fallback_with_empty_pool_is_an_error() {
    let app = setup_test_app(ProxyMode::LocalFallback, None).await;
    std::fs::create_dir_all(app.pool_dir()).unwrap();

    let response = app.client().get("/wp-content/uploads/2024/05/missing.png").await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_existing_file_is_served_without_origin() {
    let app = setup_test_app(ProxyMode::Download, Some("http://127.0.0.1:9".to_string())).await;
    let bytes = fixtures::png(10, 10, [1, 2, 3]);
    app.put_upload("2023/01/local.png", &bytes);

    let response = app.client().get("/wp-content/uploads/2023/01/local.png").await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(response.as_bytes().as_ref(), bytes.as_slice());
}

#[tokio::test]
async fn test_non_upload_paths_are_not_found() {
    let app = setup_test_app(ProxyMode::Redirect, Some("https://prod.example.com".to_string())).await;

    let response = app.client().get("/wp-content/themes/site/style.css").await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_upload_paths_only_answer_get_and_head() {
    let app = setup_test_app(ProxyMode::Redirect, Some("https://prod.example.com".to_string())).await;

    let response = app.client().post("/wp-content/uploads/2024/05/a.jpg").await;

    assert_eq!(response.status_code(), 405);
    assert_eq!(response.header("allow"), "GET, HEAD");
}
