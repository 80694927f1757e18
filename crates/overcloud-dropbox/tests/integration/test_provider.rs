//! Integration tests for DropboxCloudProvider, alone and behind DualStore

use std::sync::Arc;

use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use overcloud_core::config::StoreConfig;
use overcloud_core::domain::EntryKind;
use overcloud_core::ports::{LocalStore, RemoteConnector, RemoteError, RemoteStore};
use overcloud_core::testing::MemoryLocalStore;
use overcloud_core::DualStore;
use overcloud_dropbox::DropboxCloudProvider;

use crate::common::{self, blocking, client_for, TEST_TOKEN};

fn provider_for(uri: &str) -> DropboxCloudProvider {
    DropboxCloudProvider::new(client_for(uri))
}

#[tokio::test]
async fn test_stat_maps_metadata_and_not_found() {
    let server = MockServer::start().await;
    common::mount_file_metadata(&server, "/cloud/a.txt").await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_json(serde_json::json!({ "path": "/cloud" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "folder",
            "name": "cloud",
            "id": "id:dir-001"
        })))
        .mount(&server)
        .await;
    common::mount_conflict(&server, "files/get_metadata", "path/not_found/...").await;

    let uri = server.uri();
    let kinds = blocking(move || {
        let provider = provider_for(&uri);
        ["/cloud/a.txt", "/cloud", "/cloud/missing", ""]
            .iter()
            .map(|p| provider.stat(p))
            .collect::<Vec<_>>()
    })
    .await;

    assert_eq!(
        kinds,
        vec![
            Ok(EntryKind::File),
            Ok(EntryKind::Directory),
            Ok(EntryKind::Absent),
            Ok(EntryKind::Directory),
        ]
    );
}

#[tokio::test]
async fn test_list_skips_deleted_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": [
                {".tag": "file", "name": "b"},
                {".tag": "deleted", "name": "old"},
                {".tag": "folder", "name": "c"}
            ],
            "cursor": "done",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let names = blocking(move || provider_for(&uri).list("/cloud"))
        .await
        .unwrap();

    assert_eq!(names, vec!["b", "c"]);
}

#[tokio::test]
async fn test_error_classes() {
    let server = MockServer::start().await;
    common::mount_conflict(&server, "files/create_folder_v2", "path/conflict/folder/..").await;
    common::mount_conflict(&server, "files/move_v2", "to/conflict/file/..").await;
    common::mount_conflict(&server, "files/delete_v2", "path_lookup/not_found/..").await;
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error_summary": "expired_access_token/"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (mkdir, relocate, delete, get) = blocking(move || {
        let provider = provider_for(&uri);
        (
            provider.mkdir("/cloud/dir"),
            provider.relocate("/cloud/a", "/cloud/b"),
            provider.delete("/cloud/gone"),
            provider.get("/cloud/a"),
        )
    })
    .await;

    assert!(matches!(mkdir, Err(RemoteError::AlreadyExists(_))));
    assert!(matches!(relocate, Err(RemoteError::RelocationConflict(_))));
    assert!(matches!(delete, Err(RemoteError::NotFound(_))));
    assert!(matches!(get, Err(RemoteError::Unauthorized(_))));
}

#[tokio::test]
async fn test_relocating_a_missing_source_is_a_conflict() {
    let server = MockServer::start().await;
    common::mount_conflict(&server, "files/move_v2", "from_lookup/not_found/..").await;

    let uri = server.uri();
    let result = blocking(move || provider_for(&uri).relocate("/cloud/none", "/cloud/x")).await;

    assert!(matches!(result, Err(RemoteError::RelocationConflict(_))));
}

#[tokio::test]
async fn test_dual_store_over_dropbox_remote_only() {
    let server = MockServer::start().await;
    common::mount_account(&server, TEST_TOKEN).await;

    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header(
            "Dropbox-API-Arg",
            r#"{"path":"/cloud/reports/q1.csv","mode":"overwrite","autorename":false,"mute":true}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "q1.csv",
            "id": "id:q1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/cloud/reports/q1.csv"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b\n1,2\n".to_vec()))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (uses_remote, text) = blocking(move || {
        let provider = Arc::new(provider_for(&uri));
        let connector: &dyn RemoteConnector = &provider;
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let store = DualStore::connect(StoreConfig::remote_only("/cloud"), local, Some(connector))
            .expect("store should connect");

        store
            .write("reports/q1.csv", "a,b\n1,2\n", false)
            .expect("write should reach Dropbox");
        (store.uses_remote(), store.read_to_string("/reports/q1.csv", false))
    })
    .await;

    assert!(uses_remote);
    assert_eq!(text.unwrap(), "a,b\n1,2\n");
}

#[tokio::test]
async fn test_rejected_token_leaves_store_without_cloud() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error_summary": "invalid_access_token/"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (uses_local, uses_remote) = blocking(move || {
        let provider = Arc::new(provider_for(&uri));
        let connector: &dyn RemoteConnector = &provider;
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let store = DualStore::connect(
            StoreConfig::dual("/data", "/cloud", false),
            local,
            Some(connector),
        )
        .expect("local backend remains");
        (store.uses_local(), store.uses_remote())
    })
    .await;

    assert!(uses_local);
    assert!(!uses_remote);
}
