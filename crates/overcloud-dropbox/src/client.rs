//! Dropbox HTTP API v2 client
//!
//! A typed, blocking client over the Dropbox RPC and content endpoints.
//! Handles the bearer header, `Dropbox-API-Arg` encoding, error
//! classification and `429` back-off.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use overcloud_dropbox::client::DropboxClient;
//!
//! # fn example() -> Result<(), overcloud_dropbox::DropboxError> {
//! let client = DropboxClient::new("access-token-here");
//! let account = client.get_current_account()?;
//! println!("Hello, {}", account.name.display_name);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use overcloud_core::domain::EntryKind;

use crate::retry::{retry_delay, DEFAULT_MAX_RETRIES};
use crate::DropboxError;

/// Base URL for RPC endpoints
pub const API_BASE_URL: &str = "https://api.dropboxapi.com/2";

/// Base URL for content (upload/download) endpoints
pub const CONTENT_BASE_URL: &str = "https://content.dropboxapi.com/2";

/// Header carrying the JSON argument of content endpoints
const DROPBOX_API_ARG: &str = "Dropbox-API-Arg";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Dropbox API types
// ============================================================================

/// Response from `users/get_current_account`
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: AccountName,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountName {
    pub display_name: String,
}

/// Metadata of a file, folder or deleted entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Metadata {
    File {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
        #[serde(default)]
        size: u64,
    },
    Folder {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
    },
    Deleted {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
    },
}

impl Metadata {
    /// Last path component of the entry
    pub fn name(&self) -> &str {
        match self {
            Metadata::File { name, .. }
            | Metadata::Folder { name, .. }
            | Metadata::Deleted { name, .. } => name,
        }
    }

    /// Entry kind; deleted entries count as absent
    pub fn kind(&self) -> EntryKind {
        match self {
            Metadata::File { .. } => EntryKind::File,
            Metadata::Folder { .. } => EntryKind::Directory,
            Metadata::Deleted { .. } => EntryKind::Absent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<Metadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_summary: Option<String>,
}

#[derive(Debug, Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
}

#[derive(Debug, Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateFolderArg<'a> {
    path: &'a str,
    autorename: bool,
}

#[derive(Debug, Serialize)]
struct RelocationArg<'a> {
    from_path: &'a str,
    to_path: &'a str,
    autorename: bool,
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
}

/// Serializes `value` for an HTTP header, escaping every non-ASCII
/// character (and DEL) as `\uXXXX`.
pub(crate) fn header_json<T: Serialize>(value: &T) -> Result<String, DropboxError> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units).iter() {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

// ============================================================================
// ClientSettings
// ============================================================================

/// Endpoints and transport limits of a [`DropboxClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Base URL for RPC endpoints
    pub api_url: String,
    /// Base URL for upload/download endpoints
    pub content_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after a `429` before giving up
    pub max_retries: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: API_BASE_URL.to_string(),
            content_url: CONTENT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClientSettings {
    /// Default limits with both hosts pointed elsewhere (useful for testing)
    pub fn with_base_urls(api_url: impl Into<String>, content_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            content_url: content_url.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// DropboxClient
// ============================================================================

/// Blocking HTTP client for the Dropbox API
///
/// Must not be created or dropped inside an async runtime.
#[derive(Debug)]
pub struct DropboxClient {
    client: Client,
    api_url: String,
    content_url: String,
    access_token: String,
    max_retries: u32,
}

impl DropboxClient {
    /// Creates a client for the public Dropbox endpoints
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: API_BASE_URL.to_string(),
            content_url: CONTENT_BASE_URL.to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Creates a client with custom base URLs (useful for testing)
    pub fn with_base_urls(
        access_token: impl Into<String>,
        api_url: impl Into<String>,
        content_url: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            content_url: content_url.into(),
            ..Self::new(access_token)
        }
    }

    /// Creates a client from explicit settings
    pub fn from_settings(
        access_token: impl Into<String>,
        settings: &ClientSettings,
    ) -> Result<Self, DropboxError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            content_url: settings.content_url.clone(),
            access_token: access_token.into(),
            max_retries: settings.max_retries,
        })
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DropboxClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Creates an authenticated request builder for an absolute URL
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// Fetches the account that owns the token
    #[instrument(skip(self))]
    pub fn get_current_account(&self) -> Result<Account, DropboxError> {
        let account: Account = self.rpc("users/get_current_account", &())?;
        debug!(account_id = %account.account_id, "Fetched current account");
        Ok(account)
    }

    /// Fetches the metadata of a single entry
    #[instrument(skip(self))]
    pub fn get_metadata(&self, path: &str) -> Result<Metadata, DropboxError> {
        self.rpc("files/get_metadata", &PathArg { path })
    }

    /// Lists a folder, following `has_more` cursors until exhausted
    #[instrument(skip(self))]
    pub fn list_folder(&self, path: &str) -> Result<Vec<Metadata>, DropboxError> {
        let mut page: ListFolderResult = self.rpc(
            "files/list_folder",
            &ListFolderArg {
                path,
                recursive: false,
            },
        )?;
        let mut entries = std::mem::take(&mut page.entries);

        while page.has_more {
            page = self.rpc(
                "files/list_folder/continue",
                &CursorArg {
                    cursor: &page.cursor,
                },
            )?;
            entries.append(&mut page.entries);
        }

        debug!(entries = entries.len(), "Folder listed");
        Ok(entries)
    }

    /// Creates a folder; Dropbox creates missing parents itself
    #[instrument(skip(self))]
    pub fn create_folder(&self, path: &str) -> Result<(), DropboxError> {
        let _: IgnoredAny = self.rpc(
            "files/create_folder_v2",
            &CreateFolderArg {
                path,
                autorename: false,
            },
        )?;
        Ok(())
    }

    /// Moves a file or folder
    #[instrument(skip(self))]
    pub fn move_entry(&self, from_path: &str, to_path: &str) -> Result<(), DropboxError> {
        let _: IgnoredAny = self.rpc(
            "files/move_v2",
            &RelocationArg {
                from_path,
                to_path,
                autorename: false,
            },
        )?;
        Ok(())
    }

    /// Deletes a file or folder
    #[instrument(skip(self))]
    pub fn delete(&self, path: &str) -> Result<(), DropboxError> {
        let _: IgnoredAny = self.rpc("files/delete_v2", &PathArg { path })?;
        Ok(())
    }

    /// Uploads a file in a single request, overwriting any existing file
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn upload(&self, path: &str, data: &[u8]) -> Result<(), DropboxError> {
        let arg = header_json(&UploadArg {
            path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        })?;
        let url = format!("{}/files/upload", self.content_url);

        self.execute_with_retry("files/upload", || {
            self.request(Method::POST, &url)
                .header(DROPBOX_API_ARG, arg.as_str())
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data.to_vec())
        })?;

        debug!("Upload complete");
        Ok(())
    }

    /// Downloads a file's contents
    #[instrument(skip(self))]
    pub fn download(&self, path: &str) -> Result<Vec<u8>, DropboxError> {
        let arg = header_json(&PathArg { path })?;
        let url = format!("{}/files/download", self.content_url);

        let response = self.execute_with_retry("files/download", || {
            self.request(Method::POST, &url)
                .header(DROPBOX_API_ARG, arg.as_str())
        })?;
        let bytes = response.bytes()?;

        debug!(bytes = bytes.len(), "Download complete");
        Ok(bytes.to_vec())
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    /// POSTs a JSON argument to an RPC endpoint and decodes the JSON result
    fn rpc<A, R>(&self, endpoint: &str, arg: &A) -> Result<R, DropboxError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_url, endpoint);
        let response =
            self.execute_with_retry(endpoint, || self.request(Method::POST, &url).json(arg))?;
        response
            .json::<R>()
            .map_err(|e| DropboxError::InvalidResponse(format!("{endpoint}: {e}")))
    }

    /// Sends a request, sleeping and retrying on `429 Too Many Requests`.
    ///
    /// `build` is called once per attempt. Any other non-success status is
    /// classified into a [`DropboxError`].
    pub fn execute_with_retry<F>(&self, endpoint: &str, build: F) -> Result<Response, DropboxError>
    where
        F: Fn() -> RequestBuilder,
    {
        for attempt in 0..=self.max_retries {
            let response = build().send()?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_delay(response.headers());
                if attempt >= self.max_retries {
                    warn!(endpoint, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(DropboxError::TooManyRequests { retry_after });
                }

                info!(
                    endpoint,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                std::thread::sleep(retry_after);
                continue;
            }

            if !status.is_success() {
                let err = error_from_response(response);
                debug!(endpoint, %status, error = %err, "Request failed");
                return Err(err);
            }

            if attempt > 0 {
                info!(endpoint, attempt, "Request succeeded after retry");
            }
            return Ok(response);
        }

        Err(DropboxError::InvalidResponse(format!(
            "retry loop exited unexpectedly for {endpoint}"
        )))
    }
}

/// Classifies a non-success response using its `error_summary`
fn error_from_response(response: Response) -> DropboxError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    let summary = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_summary)
        .unwrap_or(body);
    DropboxError::from_status(status, summary)
}
