//! OAuth2 PKCE authentication for the Dropbox API
//!
//! Dropbox desktop apps use the "no redirect" variant of the Authorization
//! Code flow with PKCE: the user opens the authorize URL, approves the app
//! and pastes the displayed code back.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - App credentials and OAuth endpoints
//! - [`PKCEFlow`] - Challenge generation, code exchange and token refresh
//! - [`TokenStorage`] - Persistence of tokens ([`FileTokenStorage`],
//!   [`KeyringTokenStorage`])
//! - [`DropboxConnector`] - Turns credentials into a verified
//!   [`DropboxCloudProvider`]

use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RefreshToken,
    TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};

use overcloud_core::ports::{RemoteConnector, RemoteError, RemoteStore, Tokens};

use crate::client::{Account, ClientSettings, DropboxClient};
use crate::provider::DropboxCloudProvider;

/// Dropbox OAuth2 authorization endpoint
const AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";

/// Dropbox OAuth2 token endpoint
const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "overcloud";

/// Keyring username used when none is given
const DEFAULT_KEYRING_USER: &str = "dropbox";

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Dropbox app key (OAuth client ID)
    pub app_key: String,
    /// Dropbox app secret; optional with PKCE
    pub app_secret: Option<String>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config for the given app key with the public endpoints
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: None,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Adds the app secret
    pub fn with_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Points the flow at custom endpoints (useful for testing)
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::blocking::Client,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.app_key.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?);
        if let Some(secret) = &config.app_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        // The token endpoint must never be followed through a redirect.
        let http = reqwest::blocking::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self { client, http })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests `token_access_type=offline` so the exchange also yields a
    /// refresh token. The returned verifier must be kept until the code
    /// exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("token_access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges a pasted authorization code for tokens
    pub fn exchange_code(&self, code: String, pkce_verifier: PkceCodeVerifier) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request(&self.http)
            .context("Failed to exchange authorization code")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: token_result
                .expires_in()
                .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64)),
        };

        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Obtains a fresh access token; the refresh token is kept
    pub fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request(&self.http)
            .context("Failed to refresh token")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: token_result
                .expires_in()
                .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64)),
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

// ============================================================================
// Token storage
// ============================================================================

/// Persists tokens between runs
pub trait TokenStorage: Send + Sync {
    /// Returns the stored tokens, `None` if nothing is stored
    fn load(&self) -> Result<Option<Tokens>>;

    /// Replaces the stored tokens
    fn store(&self, tokens: &Tokens) -> Result<()>;

    /// Removes the stored tokens; succeeds if nothing is stored
    fn clear(&self) -> Result<()>;
}

/// Stores tokens in a plain file
///
/// A long-lived token is written as the bare token string; anything with a
/// refresh token or expiry is written as JSON. Both forms are read back.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<Tokens>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file");
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to read token file {}",
                    self.path.display()
                )))
            }
        };

        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let tokens = if content.starts_with('{') {
            serde_json::from_str(content).context("Failed to parse token file")?
        } else {
            Tokens::long_lived(content)
        };
        debug!(path = %self.path.display(), "Loaded tokens from file");
        Ok(Some(tokens))
    }

    fn store(&self, tokens: &Tokens) -> Result<()> {
        let content = if tokens.refresh_token.is_none() && tokens.expires_at.is_none() {
            tokens.access_token.clone()
        } else {
            serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token file permissions")?;
        }

        info!(path = %self.path.display(), "Stored tokens in file");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed token file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove token file")),
        }
    }
}

/// Stores tokens in the system keyring
///
/// Uses the `keyring` crate (GNOME Keyring, KDE Wallet, macOS Keychain).
/// Tokens are serialized as JSON under the service name "overcloud".
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    username: String,
}

impl KeyringTokenStorage {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.username)
            .context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_USER)
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<Tokens>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(user = %self.username, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(user = %self.username, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn store(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;
        debug!(user = %self.username, "Stored tokens in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(user = %self.username, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// Interactive code entry
// ============================================================================

/// Asks the user to authorize the app at a URL and returns the pasted code
pub type CodePrompt = dyn Fn(&str) -> Result<String> + Send + Sync;

/// Prompts on the terminal: opens the browser (best effort), then reads the
/// authorization code from stdin.
pub fn terminal_prompt(auth_url: &str) -> Result<String> {
    eprintln!("1. Go to: {auth_url}");
    eprintln!("2. Click \"Allow\" (you might have to log in first).");
    eprintln!("3. Copy the authorization code.");
    if let Err(e) = webbrowser::open(auth_url) {
        warn!(error = %e, "Could not open a browser");
    }
    eprint!("Enter the authorization code here: ");
    io::stderr().flush().ok();

    let mut code = String::new();
    io::stdin()
        .lock()
        .read_line(&mut code)
        .context("Failed to read authorization code")?;
    let code = code.trim().to_string();
    if code.is_empty() {
        bail!("No authorization code entered");
    }
    Ok(code)
}

// ============================================================================
// DropboxConnector
// ============================================================================

/// Produces a verified Dropbox session
///
/// Tries, in order: the access token given explicitly, the stored token
/// (refreshed first if it has expired). If that token is rejected, or none
/// exists, the interactive flow runs once and its tokens are persisted.
pub struct DropboxConnector {
    settings: ClientSettings,
    access_token: Option<String>,
    oauth: Option<OAuth2Config>,
    storage: Option<Box<dyn TokenStorage>>,
    prompt: Option<Box<CodePrompt>>,
}

impl std::fmt::Debug for DropboxConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxConnector")
            .field("settings", &self.settings)
            .field("has_access_token", &self.access_token.is_some())
            .field("oauth", &self.oauth.as_ref().map(|o| &o.app_key))
            .field("has_storage", &self.storage.is_some())
            .field("interactive", &self.prompt.is_some())
            .finish()
    }
}

impl DropboxConnector {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            access_token: None,
            oauth: None,
            storage: None,
            prompt: None,
        }
    }

    /// Uses a pre-obtained access token ahead of any stored one
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Enables token refresh and the interactive flow for this app
    pub fn with_oauth(mut self, config: OAuth2Config) -> Self {
        self.oauth = Some(config);
        self
    }

    pub fn with_storage(mut self, storage: Box<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the callback that collects the authorization code
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Runs the interactive flow and persists the resulting tokens
    pub fn login(&self) -> Result<Tokens> {
        let (Some(config), Some(prompt)) = (&self.oauth, &self.prompt) else {
            bail!("Interactive login needs an app key and a code prompt");
        };
        info!("Starting Dropbox OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(config)?;
        let (auth_url, _csrf_token, pkce_verifier) = flow.generate_auth_url();
        let code = prompt(&auth_url)?;
        let tokens = flow.exchange_code(code, pkce_verifier)?;

        self.persist(&tokens);
        info!("Dropbox login completed");
        Ok(tokens)
    }

    /// Removes stored tokens
    pub fn logout(&self) -> Result<()> {
        match &self.storage {
            Some(storage) => storage.clear(),
            None => Ok(()),
        }
    }

    /// Looks up the account behind the current credentials, without
    /// falling back to the interactive flow
    pub fn current_account(&self) -> Result<Option<Account>> {
        let Some(tokens) = self.initial_tokens()? else {
            return Ok(None);
        };
        let client = DropboxClient::from_settings(tokens.access_token, &self.settings)?;
        Ok(Some(client.get_current_account()?))
    }

    /// The explicit token, else the stored one (refreshed if expired)
    fn initial_tokens(&self) -> Result<Option<Tokens>> {
        if let Some(token) = &self.access_token {
            return Ok(Some(Tokens::long_lived(token.clone())));
        }
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        let Some(tokens) = storage.load()? else {
            return Ok(None);
        };

        if tokens.is_expired() {
            if let (Some(config), Some(refresh)) = (&self.oauth, &tokens.refresh_token) {
                match PKCEFlow::new(config).and_then(|flow| flow.refresh_token(refresh)) {
                    Ok(fresh) => {
                        self.persist(&fresh);
                        return Ok(Some(fresh));
                    }
                    Err(e) => warn!(error = %format!("{e:#}"), "Token refresh failed"),
                }
            }
        }
        Ok(Some(tokens))
    }

    fn persist(&self, tokens: &Tokens) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.store(tokens) {
                warn!(error = %format!("{e:#}"), "Could not persist Dropbox tokens");
            }
        }
    }

    fn provider(&self, tokens: &Tokens) -> Result<DropboxCloudProvider, RemoteError> {
        let client = DropboxClient::from_settings(tokens.access_token.clone(), &self.settings)
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(DropboxCloudProvider::new(client))
    }
}

impl RemoteConnector for DropboxConnector {
    fn connect(&self) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        let tokens = self
            .initial_tokens()
            .map_err(|e| RemoteError::Transport(format!("{e:#}")))?;

        if let Some(tokens) = tokens {
            let provider = self.provider(&tokens)?;
            match provider.verify() {
                Ok(()) => return Ok(Arc::new(provider)),
                Err(RemoteError::Unauthorized(msg)) => {
                    warn!(error = %msg, "Dropbox token rejected");
                }
                Err(e) => return Err(e),
            }
        }

        if self.oauth.is_none() || self.prompt.is_none() {
            return Err(RemoteError::Unauthorized(
                "no usable Dropbox credentials".to_string(),
            ));
        }
        let tokens = self
            .login()
            .map_err(|e| RemoteError::Unauthorized(format!("{e:#}")))?;
        let provider = self.provider(&tokens)?;
        provider.verify()?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_oauth2_config_defaults() {
        let config = OAuth2Config::new("app-key");
        assert_eq!(config.app_key, "app-key");
        assert_eq!(config.app_secret, None);
        assert_eq!(config.auth_url, AUTH_URL);
        assert_eq!(config.token_url, TOKEN_URL);

        let config = config.with_secret("s3cret");
        assert_eq!(config.app_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_pkce_flow_generates_auth_url() {
        let flow = PKCEFlow::new(&OAuth2Config::new("app-key")).unwrap();
        let (url, _csrf, _verifier) = flow.generate_auth_url();

        assert!(url.starts_with("https://www.dropbox.com/oauth2/authorize"));
        assert!(url.contains("client_id=app-key"));
        assert!(url.contains("code_challenge"));
        assert!(url.contains("token_access_type=offline"));
        assert!(!url.contains("redirect_uri"));
    }

    #[test]
    fn test_pkce_flow_rejects_bad_endpoint() {
        let config = OAuth2Config::new("k").with_endpoints("not a url", TOKEN_URL);
        assert!(PKCEFlow::new(&config).is_err());
    }

    #[test]
    fn test_file_storage_round_trips_both_formats() {
        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("token"));
        assert!(storage.load().unwrap().is_none());

        storage.store(&Tokens::long_lived("sl.raw")).unwrap();
        assert_eq!(fs::read_to_string(storage.path()).unwrap(), "sl.raw");
        assert_eq!(storage.load().unwrap(), Some(Tokens::long_lived("sl.raw")));

        let refreshable = Tokens {
            access_token: "sl.short".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Some(Utc::now() + Duration::hours(4)),
        };
        storage.store(&refreshable).unwrap();
        assert_eq!(storage.load().unwrap(), Some(refreshable));

        storage.clear().unwrap();
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_file_storage_reads_raw_token_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".dropbox_access_token");
        fs::write(&path, "sl.abc\n").unwrap();

        let tokens = FileTokenStorage::new(&path).load().unwrap().unwrap();
        assert_eq!(tokens.access_token, "sl.abc");
        assert!(tokens.refresh_token.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested/token"));
        storage.store(&Tokens::long_lived("x")).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_connector_prefers_explicit_token() {
        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("token"));
        storage.store(&Tokens::long_lived("stored")).unwrap();

        let connector = DropboxConnector::new(ClientSettings::default())
            .with_storage(Box::new(storage))
            .with_access_token("explicit");
        let tokens = connector.initial_tokens().unwrap().unwrap();
        assert_eq!(tokens.access_token, "explicit");
    }

    #[test]
    fn test_connector_without_credentials_or_prompt_fails() {
        let connector = DropboxConnector::new(ClientSettings::default());
        let err = connector.connect().err().unwrap();
        assert!(matches!(err, RemoteError::Unauthorized(_)));
        assert!(connector.login().is_err());
    }
}
