//! Overcloud CLI - Command-line interface for Overcloud
//!
//! Provides commands for:
//! - Querying and editing files on the local filesystem, Dropbox, or both
//! - Copying single files between the two backends
//! - Authentication with Dropbox
//! - Inspecting the configuration

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use overcloud_core::config::Config;

mod commands;
mod output;

use commands::{
    auth::AuthCommand,
    config::ConfigCommand,
    store::{
        CatCommand, IsDirCommand, IsFileCommand, LsCommand, MkdirCommand, MvCommand, PutCommand,
        RmCommand, SyncCommand,
    },
    Context, StorageArgs,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "overcloud",
    version,
    about = "One storage interface over the local filesystem and Dropbox"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    storage: StorageArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check whether a path is a file
    Isfile(IsFileCommand),
    /// Check whether a path is a directory
    Isdir(IsDirCommand),
    /// Print a file's content
    Cat(CatCommand),
    /// Write a file
    Put(PutCommand),
    /// Remove a file
    Rm(RmCommand),
    /// Rename a file or directory
    Mv(MvCommand),
    /// List a directory
    Ls(LsCommand),
    /// Create a directory and its parents
    Mkdir(MkdirCommand),
    /// Copy one file between the local filesystem and Dropbox
    Sync(SyncCommand),
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Loads the configuration file and overlays the flags
    fn load_config(&self) -> Result<(Config, PathBuf)> {
        let (config, path) = match &self.config {
            Some(path) => (
                Config::load(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                path.clone(),
            ),
            None => {
                let path = Config::default_path();
                (Config::load_or_default(&path), path)
            }
        };
        Ok((self.storage.apply(config), path))
    }
}

fn init_tracing(verbose: u8, configured: &str, json: bool) {
    let filter = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so command output on stdout stays machine-readable.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = cli.load_config()?;

    init_tracing(cli.verbose, &config.logging.level, cli.json);
    debug!(config_path = %config_path.display(), "Loaded configuration");
    for error in config.validate() {
        warn!(%error, "Configuration problem");
    }

    let ctx = Context {
        config,
        config_path,
        access_token: cli.storage.dropbox_access_token.clone(),
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
    };

    match &cli.command {
        Commands::Isfile(cmd) => cmd.execute(&ctx),
        Commands::Isdir(cmd) => cmd.execute(&ctx),
        Commands::Cat(cmd) => cmd.execute(&ctx),
        Commands::Put(cmd) => cmd.execute(&ctx),
        Commands::Rm(cmd) => cmd.execute(&ctx),
        Commands::Mv(cmd) => cmd.execute(&ctx),
        Commands::Ls(cmd) => cmd.execute(&ctx),
        Commands::Mkdir(cmd) => cmd.execute(&ctx),
        Commands::Sync(cmd) => cmd.execute(&ctx),
        Commands::Auth(cmd) => cmd.execute(&ctx),
        Commands::Config(cmd) => cmd.execute(&ctx),
    }
}
