// Media host REST client tests against a local mock server

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tunecloud::store::{HttpMediaHost, MediaKind, ObjectStorage, ObjectUpload};
use tunecloud::AppError;

fn take_one() -> ObjectUpload {
    ObjectUpload::new("take1.mp3", Some("audio/mpeg"), b"fake-mp3-frames".to_vec()).in_folder("songs/audio")
}

#[tokio::test]
async fn test_upload_posts_multipart_to_resource_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/video/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "songs/audio/abc123",
            "secure_url": "https://cdn.test/video/upload/songs/audio/abc123.mp3",
            "url": "http://cdn.test/video/upload/songs/audio/abc123.mp3",
            "bytes": 15
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = HttpMediaHost::new(&mock_server.uri(), Some("unsigned_songs".to_string())).unwrap();
    let stored = host.upload(take_one()).await.unwrap();

    assert_eq!(stored.public_id, "songs/audio/abc123");
    assert_eq!(stored.url, "https://cdn.test/video/upload/songs/audio/abc123.mp3");
    assert_eq!(stored.bytes, 15);
    assert_eq!(stored.kind, MediaKind::Audio);

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("name=\"file\"; filename=\"take1.mp3\""));
    assert!(body.contains("fake-mp3-frames"));
    assert!(body.contains("songs/audio"));
    assert!(body.contains("unsigned_songs"));
}

#[tokio::test]
async fn test_upload_falls_back_to_plain_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "songs/covers/def456",
            "url": "http://cdn.test/image/upload/songs/covers/def456.png"
        })))
        .mount(&mock_server)
        .await;

    let host = HttpMediaHost::new(&mock_server.uri(), None).unwrap();
    let cover = ObjectUpload::new("cover.png", Some("image/png"), vec![0x89u8, 0x50, 0x4E, 0x47]);
    let stored = host.upload(cover).await.unwrap();

    assert_eq!(stored.url, "http://cdn.test/image/upload/songs/covers/def456.png");
    // Size comes from the upload when the host leaves it out
    assert_eq!(stored.bytes, 4);
    assert_eq!(stored.kind, MediaKind::Image);
}

#[tokio::test]
async fn test_upload_error_carries_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/video/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Upload preset must be whitelisted"))
        .mount(&mock_server)
        .await;

    let host = HttpMediaHost::new(&mock_server.uri(), Some("nope".to_string())).unwrap();
    let err = host.upload(take_one()).await.unwrap_err();

    match err {
        AppError::MediaHost { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("whitelisted"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_delete_uses_the_uploaded_kind() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/video/destroy"))
        .and(body_string_contains("public_id=songs%2Faudio%2Fabc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/image/destroy"))
        .and(body_string_contains("public_id=songs%2Fcovers%2Fdef456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/raw/destroy"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let host = HttpMediaHost::new(&mock_server.uri(), None).unwrap();
    host.delete("songs/audio/abc123", MediaKind::Audio).await.unwrap();
    host.delete("songs/covers/def456", MediaKind::Image).await.unwrap();

    mock_server.verify().await;
}

#[tokio::test]
async fn test_delete_refusal_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/video/destroy"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid signature"))
        .mount(&mock_server)
        .await;

    let host = HttpMediaHost::new(&mock_server.uri(), None).unwrap();
    let err = host.delete("songs/audio/abc123", MediaKind::Audio).await.unwrap_err();
    assert!(matches!(err, AppError::MediaHost { status: 401, .. }));
}
