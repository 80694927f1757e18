//! Storage commands - the DualStore operations on the command line
//!
//! `isfile`, `isdir`, `cat`, `put`, `rm`, `mv`, `ls`, `mkdir` map one to one
//! onto the store; `sync` copies a single file between the backends.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use overcloud_core::store::{Agreement, OutcomeSummary, SyncDirection};

use super::Context;
use crate::output::OutputFormat;

/// How strictly both backends must agree on an existence check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AgreementArg {
    /// Follow the sync setting
    #[default]
    Configured,
    /// Either backend is enough
    Either,
    /// Both backends must hold the entry
    Both,
}

impl From<AgreementArg> for Agreement {
    fn from(arg: AgreementArg) -> Self {
        match arg {
            AgreementArg::Configured => Agreement::Configured,
            AgreementArg::Either => Agreement::Either,
            AgreementArg::Both => Agreement::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Local filesystem to Dropbox
    Upload,
    /// Dropbox to local filesystem
    Download,
}

impl From<DirectionArg> for SyncDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Upload => SyncDirection::Upload,
            DirectionArg::Download => SyncDirection::Download,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Args)]
pub struct IsFileCommand {
    /// Path to check
    pub path: String,

    /// Required agreement between the backends
    #[arg(long, value_enum, default_value_t = AgreementArg::Configured)]
    pub agreement: AgreementArg,
}

impl IsFileCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let found = store.is_file(&self.path, self.agreement.into());
        ctx.formatter().answer("isfile", &self.path, found);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct IsDirCommand {
    /// Path to check
    pub path: String,

    /// Required agreement between the backends
    #[arg(long, value_enum, default_value_t = AgreementArg::Configured)]
    pub agreement: AgreementArg,
}

impl IsDirCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let found = store.is_dir(&self.path, self.agreement.into());
        ctx.formatter().answer("isdir", &self.path, found);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Directory to list
    #[arg(default_value = "/")]
    pub path: String,
}

impl LsCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let names = store.listdir(&self.path);
        ctx.formatter().listing(&self.path, &names);
        Ok(())
    }
}

// ============================================================================
// Content
// ============================================================================

#[derive(Debug, Args)]
pub struct CatCommand {
    /// File to print
    pub path: String,

    /// Read the gzip-compressed variant (`<path>.gz`) and decompress it
    #[arg(long, short = 'z')]
    pub compressed: bool,
}

impl CatCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let data = store
            .read(&self.path, self.compressed)
            .with_context(|| format!("Failed to read {}", self.path))?;

        match ctx.format {
            OutputFormat::Json => ctx.formatter().print_json(&serde_json::json!({
                "path": self.path,
                "bytes": data.len(),
                "content": String::from_utf8_lossy(&data),
            })),
            OutputFormat::Human => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&data)?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct PutCommand {
    /// Destination path
    pub path: String,

    /// Content to write; read from stdin when neither this nor --from-file is given
    #[arg(conflicts_with = "from_file")]
    pub content: Option<String>,

    /// Copy the content of a local file
    #[arg(long, value_name = "FILE")]
    pub from_file: Option<PathBuf>,

    /// Gzip the content and append `.gz` to the path
    #[arg(long, short = 'z')]
    pub compressed: bool,
}

impl PutCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let data = self.payload()?;
        let store = ctx.open_store()?;
        let outcome = store
            .write(&self.path, &data, self.compressed)
            .with_context(|| format!("Failed to write {}", self.path))?;

        info!(path = %outcome.path, bytes = data.len(), "Wrote file");
        ctx.formatter()
            .outcome("Wrote", &OutcomeSummary::from(&outcome));
        Ok(())
    }

    fn payload(&self) -> Result<Vec<u8>> {
        if let Some(content) = &self.content {
            return Ok(content.clone().into_bytes());
        }
        if let Some(file) = &self.from_file {
            return fs::read(file).with_context(|| format!("Failed to read {}", file.display()));
        }
        let mut data = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
        Ok(data)
    }
}

// ============================================================================
// Namespace
// ============================================================================

#[derive(Debug, Args)]
pub struct RmCommand {
    /// File to remove
    pub path: String,
}

impl RmCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        if !store.remove(&self.path) {
            bail!("Failed to remove {} from every backend", self.path);
        }
        ctx.formatter().success(&format!("Removed {}", self.path));
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MvCommand {
    /// Source path
    pub src: String,
    /// Destination path; an existing destination is left untouched
    pub dst: String,
}

impl MvCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let outcome = store.rename(&self.src, &self.dst);
        ctx.formatter().outcome(
            &format!("Renamed {} -> {}", self.src, self.dst),
            &OutcomeSummary::from(&outcome),
        );
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct MkdirCommand {
    /// Directory to create, with any missing parents
    pub path: String,
}

impl MkdirCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let outcome = store
            .makedirs(&self.path)
            .with_context(|| format!("Failed to create {}", self.path))?;
        ctx.formatter().outcome(
            &format!("Created {}", self.path),
            &OutcomeSummary::from(&outcome),
        );
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Path on the local filesystem
    pub local: String,

    /// Path on Dropbox (defaults to the local path)
    pub remote: Option<String>,

    /// Copy direction
    #[arg(long, value_enum, default_value_t = DirectionArg::Upload)]
    pub direction: DirectionArg,
}

impl SyncCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let store = ctx.open_store()?;
        let remote = self.remote.as_deref().unwrap_or(&self.local);
        store
            .sync_file(&self.local, remote, self.direction.into())
            .with_context(|| format!("Failed to sync {}", self.local))?;

        let arrow = match self.direction {
            DirectionArg::Upload => "->",
            DirectionArg::Download => "<-",
        };
        ctx.formatter()
            .success(&format!("Synced {} {arrow} dropbox:{remote}", self.local));
        Ok(())
    }
}
