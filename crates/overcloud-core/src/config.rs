//! Configuration module for Overcloud.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder pattern for
//! programmatic use. [`StorageConfig::resolve`] turns the file/flag view into
//! the [`StoreConfig`] a `DualStore` is built from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default location of the persisted Dropbox access token.
pub const DEFAULT_TOKEN_FILE: &str = "./.dropbox_access_token";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Overcloud.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Backend selection as written in the config file or on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Read and write the local filesystem.
    pub use_local: bool,
    /// Read and write the Dropbox cloud.
    pub use_remote: bool,
    /// Local directory all relative paths are rooted under.
    pub local_prefix: PathBuf,
    /// Cloud folder all relative paths are rooted under.
    pub remote_prefix: String,
    /// Copy a file to the side that lacks it when it is looked up.
    pub sync_if_missing: bool,
}

/// Dropbox app credentials and token persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Dropbox app key. `None` until the user registers an app.
    pub app_key: Option<String>,
    /// Dropbox app secret (optional with PKCE).
    pub app_secret: Option<String>,
    /// Where tokens are persisted when the keyring is not used.
    pub token_file: PathBuf,
    /// Store tokens in the system keyring instead of `token_file`.
    pub use_keyring: bool,
}

/// HTTP client settings for the cloud adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries after an HTTP 429 response.
    pub max_retries: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// The effective, immutable backend configuration of one `DualStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub use_local: bool,
    pub use_remote: bool,
    pub local_prefix: PathBuf,
    pub remote_prefix: String,
    pub sync_if_missing: bool,
}

impl StoreConfig {
    /// Local filesystem only, rooted at `prefix`.
    pub fn local_only(prefix: impl Into<PathBuf>) -> Self {
        Self {
            use_local: true,
            use_remote: false,
            local_prefix: prefix.into(),
            remote_prefix: String::new(),
            sync_if_missing: false,
        }
    }

    /// Cloud only, rooted at `prefix`.
    pub fn remote_only(prefix: impl Into<String>) -> Self {
        Self {
            use_local: false,
            use_remote: true,
            local_prefix: PathBuf::new(),
            remote_prefix: prefix.into(),
            sync_if_missing: false,
        }
    }

    /// Both backends.
    pub fn dual(
        local_prefix: impl Into<PathBuf>,
        remote_prefix: impl Into<String>,
        sync_if_missing: bool,
    ) -> Self {
        Self {
            use_local: true,
            use_remote: true,
            local_prefix: local_prefix.into(),
            remote_prefix: remote_prefix.into(),
            sync_if_missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/overcloud/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("overcloud")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            use_local: true,
            use_remote: false,
            local_prefix: PathBuf::new(),
            remote_prefix: String::new(),
            sync_if_missing: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            app_secret: None,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            use_keyring: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_retries: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig::resolve()
// ---------------------------------------------------------------------------

impl StorageConfig {
    /// Apply the backend defaulting rules and produce a [`StoreConfig`].
    ///
    /// - neither backend selected: the local filesystem is forced on
    /// - `sync_if_missing` without both backends: both are forced on, since
    ///   syncing needs two sides
    pub fn resolve(&self) -> StoreConfig {
        let mut use_local = self.use_local;
        let mut use_remote = self.use_remote;

        if self.sync_if_missing && !(use_local && use_remote) {
            warn!("sync_if_missing is on; turning on both the local filesystem and the cloud");
            use_local = true;
            use_remote = true;
        }

        if !use_local && !use_remote {
            info!("Neither the local filesystem nor the cloud selected; using the local filesystem");
            use_local = true;
        }

        if use_local && use_remote && !self.sync_if_missing {
            info!(
                "Both backends on without sync_if_missing: reads prefer the local filesystem, \
                 writes go to both"
            );
        }

        StoreConfig {
            use_local,
            use_remote,
            local_prefix: self.local_prefix.clone(),
            remote_prefix: self.remote_prefix.clone(),
            sync_if_missing: self.sync_if_missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"http.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- storage ---
        let prefix = &self.storage.local_prefix;
        if self.storage.use_local && !prefix.as_os_str().is_empty() && !prefix.is_dir() {
            errors.push(ValidationError {
                field: "storage.local_prefix".into(),
                message: format!("directory does not exist: {}", prefix.display()),
            });
        }
        let remote = &self.storage.remote_prefix;
        if !remote.is_empty() && !remote.starts_with('/') {
            errors.push(ValidationError {
                field: "storage.remote_prefix".into(),
                message: format!("must be empty or start with '/': {remote}"),
            });
        }

        // --- auth ---
        if self.auth.app_secret.is_some() && self.auth.app_key.is_none() {
            errors.push(ValidationError {
                field: "auth.app_secret".into(),
                message: "app_secret given without app_key".into(),
            });
        }
        if !self.auth.use_keyring && self.auth.token_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "auth.token_file".into(),
                message: "must be set unless use_keyring is on".into(),
            });
        }

        // --- http ---
        if self.http.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "http.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.http.max_retries > 10 {
            errors.push(ValidationError {
                field: "http.max_retries".into(),
                message: "must be in range 0..=10".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use overcloud_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .use_remote(true)
///     .remote_prefix("/research")
///     .sync_if_missing(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from disk.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- storage ---

    pub fn use_local(mut self, on: bool) -> Self {
        self.config.storage.use_local = on;
        self
    }

    pub fn use_remote(mut self, on: bool) -> Self {
        self.config.storage.use_remote = on;
        self
    }

    pub fn local_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.config.storage.local_prefix = prefix.into();
        self
    }

    pub fn remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage.remote_prefix = prefix.into();
        self
    }

    pub fn sync_if_missing(mut self, on: bool) -> Self {
        self.config.storage.sync_if_missing = on;
        self
    }

    // --- auth ---

    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.config.auth.app_key = Some(key.into());
        self
    }

    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.app_secret = Some(secret.into());
        self
    }

    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.auth.token_file = path.into();
        self
    }

    pub fn use_keyring(mut self, on: bool) -> Self {
        self.config.auth.use_keyring = on;
        self
    }

    // --- http ---

    pub fn http_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.http.timeout_secs = seconds;
        self
    }

    pub fn http_max_retries(mut self, n: u32) -> Self {
        self.config.http.max_retries = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
