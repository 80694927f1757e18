//! Shared test helpers for Dropbox API integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server. Clients are
//! built from the server URI inside [`blocking`] closures: a blocking
//! reqwest client must not be created or dropped on the async runtime.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use overcloud_dropbox::client::{ClientSettings, DropboxClient};

pub const TEST_TOKEN: &str = "test-access-token";

/// Runs blocking client code off the runtime thread
pub async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

/// Settings with both API hosts pointed at the mock server
pub fn settings_for(server: &MockServer) -> ClientSettings {
    let base = format!("{}/2", server.uri());
    ClientSettings::with_base_urls(base.clone(), base)
}

/// A client for `TEST_TOKEN` against the mock server
pub fn client_for(base_uri: &str) -> DropboxClient {
    let base = format!("{base_uri}/2");
    DropboxClient::with_base_urls(TEST_TOKEN, base.clone(), base)
}

/// Mounts `users/get_current_account` answering for the given token
pub async fn mount_account(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account_id": "dbid:test-001",
            "name": {
                "given_name": "Test",
                "surname": "User",
                "display_name": "Test User"
            },
            "email": "test@example.com",
            "email_verified": true
        })))
        .mount(server)
        .await;
}

/// Mounts an endpoint failing with HTTP 409 and the given error summary
pub async fn mount_conflict(server: &MockServer, endpoint: &str, summary: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/2/{endpoint}")))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error_summary": summary,
            "error": {".tag": "path"}
        })))
        .mount(server)
        .await;
}

/// Mounts `files/get_metadata` for a file
pub async fn mount_file_metadata(server: &MockServer, remote_path: &str) {
    let name = remote_path.rsplit('/').next().unwrap_or_default();
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(wiremock::matchers::body_json(serde_json::json!({ "path": remote_path })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            ".tag": "file",
            "name": name,
            "path_display": remote_path,
            "id": "id:file-001",
            "size": 12
        })))
        .mount(server)
        .await;
}
