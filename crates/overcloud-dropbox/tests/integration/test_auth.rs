//! Integration tests for the OAuth2 code exchange and DropboxConnector
//!
//! The token endpoint is mocked; the interactive prompt is replaced by a
//! closure that checks the authorize URL and returns a fixed code.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use overcloud_core::ports::{RemoteConnector, RemoteError, Tokens};
use overcloud_dropbox::auth::PKCEFlow;
use overcloud_dropbox::{DropboxConnector, FileTokenStorage, OAuth2Config, TokenStorage};

use crate::common::{self, blocking};

fn oauth_for(server: &MockServer) -> OAuth2Config {
    OAuth2Config::new("test-app-key").with_endpoints(
        format!("{}/oauth2/authorize", server.uri()),
        format!("{}/oauth2/token", server.uri()),
    )
}

async fn mount_code_exchange(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=pasted-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 14400,
            "refresh_token": "refresh-001",
            "account_id": "dbid:test-001",
            "uid": "12345"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_rejected_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error_summary": "expired_access_token/"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exchange_code_returns_refreshable_tokens() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, "sl.fresh").await;

    let config = oauth_for(&server);
    let tokens = blocking(move || {
        let flow = PKCEFlow::new(&config)?;
        let (_url, _csrf, verifier) = flow.generate_auth_url();
        flow.exchange_code("pasted-code".to_string(), verifier)
    })
    .await
    .expect("code exchange failed");

    assert_eq!(tokens.access_token, "sl.fresh");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-001"));
    assert!(tokens.expires_within(Duration::hours(5)));
    assert!(!tokens.is_expired());
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "sl.refreshed",
            "token_type": "bearer",
            "expires_in": 14400
        })))
        .mount(&server)
        .await;

    let config = oauth_for(&server);
    let tokens = blocking(move || PKCEFlow::new(&config)?.refresh_token("refresh-001"))
        .await
        .expect("refresh failed");

    assert_eq!(tokens.access_token, "sl.refreshed");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-001"));
}

#[tokio::test]
async fn test_connector_uses_stored_token() {
    let server = MockServer::start().await;
    common::mount_account(&server, "sl.stored").await;

    let dir = TempDir::new().unwrap();
    let token_file = dir.path().join(".dropbox_access_token");
    std::fs::write(&token_file, "sl.stored").unwrap();

    let settings = common::settings_for(&server);
    let connected = blocking(move || {
        DropboxConnector::new(settings)
            .with_storage(Box::new(FileTokenStorage::new(token_file)))
            .connect()
            .is_ok()
    })
    .await;

    assert!(connected);
}

#[tokio::test]
async fn test_rejected_token_triggers_one_interactive_login() {
    let server = MockServer::start().await;
    mount_rejected_token(&server, "sl.stale").await;
    mount_code_exchange(&server, "sl.fresh").await;
    common::mount_account(&server, "sl.fresh").await;

    let dir = TempDir::new().unwrap();
    let token_file = dir.path().join(".dropbox_access_token");
    std::fs::write(&token_file, "sl.stale").unwrap();

    let prompts = Arc::new(AtomicUsize::new(0));
    let seen = prompts.clone();
    let settings = common::settings_for(&server);
    let oauth = oauth_for(&server);
    let storage_path = token_file.clone();

    let connected = blocking(move || {
        DropboxConnector::new(settings)
            .with_oauth(oauth)
            .with_storage(Box::new(FileTokenStorage::new(storage_path)))
            .with_prompt(move |url| {
                seen.fetch_add(1, Ordering::SeqCst);
                assert!(url.contains("client_id=test-app-key"));
                assert!(url.contains("token_access_type=offline"));
                Ok("pasted-code".to_string())
            })
            .connect()
            .is_ok()
    })
    .await;

    assert!(connected);
    assert_eq!(prompts.load(Ordering::SeqCst), 1);

    let stored = FileTokenStorage::new(&token_file).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "sl.fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-001"));
}

#[tokio::test]
async fn test_gives_up_after_second_rejection() {
    let server = MockServer::start().await;
    mount_rejected_token(&server, "sl.stale").await;
    mount_code_exchange(&server, "sl.also-bad").await;
    mount_rejected_token(&server, "sl.also-bad").await;

    let settings = common::settings_for(&server);
    let oauth = oauth_for(&server);
    let result = blocking(move || {
        DropboxConnector::new(settings)
            .with_access_token("sl.stale")
            .with_oauth(oauth)
            .with_prompt(|_| Ok("pasted-code".to_string()))
            .connect()
            .err()
    })
    .await;

    assert!(matches!(result, Some(RemoteError::Unauthorized(_))), "got {result:?}");
}

#[tokio::test]
async fn test_expired_stored_token_is_refreshed_before_use() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "sl.renewed",
            "token_type": "bearer",
            "expires_in": 14400
        })))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_account(&server, "sl.renewed").await;

    let dir = TempDir::new().unwrap();
    let storage = FileTokenStorage::new(dir.path().join("tokens.json"));
    storage
        .store(&Tokens {
            access_token: "sl.expired".into(),
            refresh_token: Some("refresh-001".into()),
            expires_at: Some(Utc::now() - Duration::minutes(5)),
        })
        .unwrap();

    let settings = common::settings_for(&server);
    let oauth = oauth_for(&server);
    let reader = storage.clone();
    let connected = blocking(move || {
        DropboxConnector::new(settings)
            .with_oauth(oauth)
            .with_storage(Box::new(storage))
            .connect()
            .is_ok()
    })
    .await;

    assert!(connected);
    assert_eq!(reader.load().unwrap().unwrap().access_token, "sl.renewed");
}
