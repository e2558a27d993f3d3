//! Integration tests for the file relay and the public surface.

mod common;

use common::*;
use portal_core::kernel::test_dependencies::{MockMediaStore, TestDependencies};

#[tokio::test]
async fn upload_returns_urls_in_part_order() {
    let app = TestApp::new();

    let body = MultipartBuilder::new()
        .file("files", "front.jpg", "image/jpeg", b"front")
        .text("note", "ignored")
        .file("files", "back.jpg", "image/jpeg", b"back")
        .finish();
    let response = app.post_multipart("/files/upload", body, BOUNDARY).await;

    assert_eq!(response.status, 200, "{}", response.text);
    assert_eq!(
        response.body["data"]["urls"],
        serde_json::json!([
            "https://media.test/files/front.jpg",
            "https://media.test/files/back.jpg"
        ])
    );

    let uploads = app.deps.media.as_ref().unwrap().uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|(folder, _)| folder == "files"));
    assert_eq!(uploads[0].1.content_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn upload_rejects_oversized_file() {
    let app = TestApp::new();

    let big = vec![0u8; 5 * 1024 * 1024 + 1];
    let body = MultipartBuilder::new()
        .file("files", "huge.bin", "application/octet-stream", &big)
        .finish();
    let response = app.post_multipart("/files/upload", body, BOUNDARY).await;

    assert_eq!(response.status, 400);
    assert!(response.message().contains("5 MB"));
    assert!(app.deps.media.as_ref().unwrap().uploads().is_empty());
}

#[tokio::test]
async fn upload_rejects_unexpected_file_field() {
    let app = TestApp::new();

    let body = MultipartBuilder::new()
        .file("avatar", "me.png", "image/png", b"png")
        .finish();
    let response = app.post_multipart("/files/upload", body, BOUNDARY).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.message(), "Unexpected field 'avatar'");
}

#[tokio::test]
async fn upload_failure_is_500() {
    let app = TestApp::with(TestDependencies::new().with_media(Some(MockMediaStore::failing())));

    let body = MultipartBuilder::new()
        .file("files", "a.jpg", "image/jpeg", b"a")
        .finish();
    let response = app.post_multipart("/files/upload", body, BOUNDARY).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.message(), "Failed to upload files");
}

#[tokio::test]
async fn upload_without_media_store_is_500() {
    let app = TestApp::with(TestDependencies::new().with_media(None));

    let body = MultipartBuilder::new()
        .file("files", "a.jpg", "image/jpeg", b"a")
        .finish();
    let response = app.post_multipart("/files/upload", body, BOUNDARY).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn ping_and_landing_page() {
    let app = TestApp::new();

    let ping = app.get_with("/ping", &[]).await;
    assert_eq!(ping.status, 200);
    assert_eq!(ping.text, "pong 🏓");

    let index = app.get_with("/", &[]).await;
    assert_eq!(index.status, 200);
    assert!(index.text.contains("<html"));

    let missing = app.get_with("/does-not-exist.css", &[]).await;
    assert_eq!(missing.status, 404);
}
