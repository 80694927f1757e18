//! Integration tests for DropboxClient endpoints and 429 handling

use std::time::Duration;

use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use overcloud_core::domain::EntryKind;
use overcloud_dropbox::client::{ClientSettings, DropboxClient, Metadata};
use overcloud_dropbox::DropboxError;

use crate::common::{self, blocking, client_for, TEST_TOKEN};

#[tokio::test]
async fn test_get_current_account() {
    let server = MockServer::start().await;
    common::mount_account(&server, TEST_TOKEN).await;

    let uri = server.uri();
    let account = blocking(move || client_for(&uri).get_current_account())
        .await
        .expect("get_current_account failed");

    assert_eq!(account.account_id, "dbid:test-001");
    assert_eq!(account.name.display_name, "Test User");
}

#[tokio::test]
async fn test_unauthorized_token_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error_summary": "invalid_access_token/...",
            "error": {".tag": "invalid_access_token"}
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || client_for(&uri).get_current_account())
        .await
        .unwrap_err();

    assert!(
        matches!(err, DropboxError::Unauthorized(ref s) if s.starts_with("invalid_access_token")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_get_metadata_file_and_missing_path() {
    let server = MockServer::start().await;
    common::mount_file_metadata(&server, "/data/report.csv").await;
    common::mount_conflict(&server, "files/get_metadata", "path/not_found/..").await;

    let uri = server.uri();
    let (found, missing) = blocking(move || {
        let client = client_for(&uri);
        (
            client.get_metadata("/data/report.csv"),
            client.get_metadata("/data/other.csv"),
        )
    })
    .await;

    let found = found.expect("metadata for existing file");
    assert_eq!(found.name(), "report.csv");
    assert_eq!(found.kind(), EntryKind::File);
    assert!(matches!(missing, Err(DropboxError::NotFound(_))));
}

#[tokio::test]
async fn test_list_folder_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_json(serde_json::json!({ "path": "/data", "recursive": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [
                {".tag": "file", "name": "a.csv", "size": 1},
                {".tag": "folder", "name": "sub"}
            ],
            "cursor": "cursor-page-2",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(serde_json::json!({ "cursor": "cursor-page-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [{".tag": "file", "name": "b.csv", "size": 2}],
            "cursor": "cursor-end",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let entries = blocking(move || client_for(&uri).list_folder("/data"))
        .await
        .expect("list_folder failed");

    let names: Vec<&str> = entries.iter().map(Metadata::name).collect();
    assert_eq!(names, vec!["a.csv", "sub", "b.csv"]);
    assert_eq!(entries[1].kind(), EntryKind::Directory);
}

#[tokio::test]
async fn test_upload_sends_arg_header_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header("Authorization", "Bearer test-access-token"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(header(
            "Dropbox-API-Arg",
            r#"{"path":"/caf\u00e9.txt","mode":"overwrite","autorename":false,"mute":true}"#,
        ))
        .and(body_string("hello dropbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "café.txt",
            "id": "id:up-001",
            "size": 13
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    blocking(move || client_for(&uri).upload("/café.txt", b"hello dropbox"))
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_download_returns_raw_bytes() {
    let server = MockServer::start().await;
    let content: Vec<u8> = vec![0x1f, 0x8b, 0x08, 0x00, 0xff];
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/bin/blob.gz"}"#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.clone())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let bytes = blocking(move || client_for(&uri).download("/bin/blob.gz"))
        .await
        .expect("download failed");

    assert_eq!(bytes, content);
}

#[tokio::test]
async fn test_create_folder_conflict() {
    let server = MockServer::start().await;
    common::mount_conflict(&server, "files/create_folder_v2", "path/conflict/folder/..").await;

    let uri = server.uri();
    let err = blocking(move || client_for(&uri).create_folder("/exists"))
        .await
        .unwrap_err();

    assert!(matches!(err, DropboxError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/delete_v2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || client_for(&uri).delete("/x"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, DropboxError::ServerError(ref s) if s == "service unavailable"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_retries_after_429() {
    let server = MockServer::start().await;

    // First request is throttled, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/2/files/move_v2"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/move_v2"))
        .and(body_json(serde_json::json!({
            "from_path": "/a",
            "to_path": "/b",
            "autorename": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": {".tag": "file", "name": "b"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    blocking(move || client_for(&uri).move_entry("/a", "/b"))
        .await
        .expect("move should succeed after one retry");
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let settings = ClientSettings {
        max_retries: 2,
        ..common::settings_for(&server)
    };
    let err = blocking(move || {
        DropboxClient::from_settings(TEST_TOKEN, &settings)?.get_metadata("/slow")
    })
    .await
    .unwrap_err();

    assert!(
        matches!(err, DropboxError::TooManyRequests { retry_after } if retry_after == Duration::ZERO),
        "got {err:?}"
    );
}
