//! CLI subcommands and the wiring they share
//!
//! Every command receives a [`Context`]: the configuration file overlaid
//! with the global storage flags, plus the output format. Commands that
//! touch storage open a [`DualStore`] from it; the Dropbox session is
//! established at that point, once per invocation.

pub mod auth;
pub mod config;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::debug;

use overcloud_core::config::{AuthConfig, Config, ConfigBuilder};
use overcloud_core::ports::{LocalStore, RemoteConnector};
use overcloud_core::DualStore;
use overcloud_dropbox::auth::terminal_prompt;
use overcloud_dropbox::{
    ClientSettings, DropboxConnector, FileTokenStorage, KeyringTokenStorage, OAuth2Config,
    TokenStorage,
};
use overcloud_local::LocalFileSystemAdapter;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Backend selection and credential flags, accepted by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct StorageArgs {
    /// Use the local filesystem
    #[arg(long, global = true)]
    pub use_localfs: bool,

    /// Local folder every path is rooted under
    #[arg(long, global = true, value_name = "DIR")]
    pub localfs_rootfolder: Option<PathBuf>,

    /// Use Dropbox
    #[arg(long, global = true)]
    pub use_dropbox: bool,

    /// Dropbox folder every path is rooted under (e.g. "/data")
    #[arg(long, global = true, value_name = "FOLDER")]
    pub cloudfs_rootfolder: Option<String>,

    /// Copy a file to the backend that lacks it when it is looked up
    #[arg(long, global = true)]
    pub sync_if_missing_file: bool,

    /// Dropbox access token to use instead of the stored one
    #[arg(long, global = true, value_name = "TOKEN")]
    pub dropbox_access_token: Option<String>,

    /// Dropbox app key, for interactive login and token refresh
    #[arg(long, global = true, value_name = "KEY")]
    pub dropbox_app_key: Option<String>,

    /// Dropbox app secret
    #[arg(long, global = true, value_name = "SECRET")]
    pub dropbox_app_secret: Option<String>,
}

impl StorageArgs {
    /// Overlays the flags on the file configuration
    ///
    /// Passing either backend flag replaces the file's backend selection.
    pub fn apply(&self, config: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config);
        if self.use_localfs || self.use_dropbox {
            builder = builder
                .use_local(self.use_localfs)
                .use_remote(self.use_dropbox);
        }
        if let Some(dir) = &self.localfs_rootfolder {
            builder = builder.local_prefix(dir.clone());
        }
        if let Some(folder) = &self.cloudfs_rootfolder {
            builder = builder.remote_prefix(folder.clone());
        }
        if self.sync_if_missing_file {
            builder = builder.sync_if_missing(true);
        }
        if let Some(key) = &self.dropbox_app_key {
            builder = builder.app_key(key.clone());
        }
        if let Some(secret) = &self.dropbox_app_secret {
            builder = builder.app_secret(secret.clone());
        }
        builder.build()
    }
}

/// Everything a subcommand needs to run
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub access_token: Option<String>,
    pub format: OutputFormat,
}

impl Context {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format == OutputFormat::Json)
    }

    /// Builds the Dropbox connector from the auth and HTTP settings
    pub fn connector(&self) -> DropboxConnector {
        let settings = ClientSettings {
            timeout: Duration::from_secs(self.config.http.timeout_secs),
            max_retries: self.config.http.max_retries,
            ..ClientSettings::default()
        };
        let mut connector = DropboxConnector::new(settings)
            .with_storage(token_storage(&self.config.auth))
            .with_prompt(terminal_prompt);

        if let Some(key) = &self.config.auth.app_key {
            let mut oauth = OAuth2Config::new(key.clone());
            if let Some(secret) = &self.config.auth.app_secret {
                oauth = oauth.with_secret(secret.clone());
            }
            connector = connector.with_oauth(oauth);
        }
        if let Some(token) = &self.access_token {
            connector = connector.with_access_token(token.clone());
        }
        connector
    }

    /// Opens the store, connecting to Dropbox if it is selected
    pub fn open_store(&self) -> Result<DualStore> {
        let store_config = self.config.storage.resolve();
        debug!(?store_config, "Opening store");

        let local: Arc<dyn LocalStore> = Arc::new(LocalFileSystemAdapter::new());
        let connector = self.connector();
        let connector: &dyn RemoteConnector = &connector;

        let store = DualStore::connect(store_config, local, Some(connector))
            .context("No usable storage backend")?;
        if self.config.storage.use_remote && !store.uses_remote() {
            self.formatter()
                .warn("Dropbox is unavailable; continuing with the local filesystem only");
        }
        Ok(store)
    }
}

/// Token persistence chosen by the auth settings
pub fn token_storage(auth: &AuthConfig) -> Box<dyn TokenStorage> {
    if auth.use_keyring {
        Box::new(KeyringTokenStorage::default())
    } else {
        Box::new(FileTokenStorage::new(auth.token_file.clone()))
    }
}
