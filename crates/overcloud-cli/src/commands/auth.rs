//! Auth commands - Login, Logout, and Status for Dropbox authentication
//!
//! Provides the `overcloud auth` subcommands which:
//! 1. `login`  - Runs the PKCE code-entry flow and persists the tokens
//!    (token file or system keyring, per `auth.use_keyring`).
//! 2. `logout` - Removes the persisted tokens.
//! 3. `status` - Shows the account behind the current token.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use tracing::info;

use super::Context;
use crate::output::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize Overcloud with Dropbox
    Login,
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            AuthCommand::Login => self.execute_login(ctx),
            AuthCommand::Logout => self.execute_logout(ctx),
            AuthCommand::Status => self.execute_status(ctx),
        }
    }

    fn execute_login(&self, ctx: &Context) -> Result<()> {
        let fmt = ctx.formatter();
        if ctx.config.auth.app_key.is_none() {
            anyhow::bail!(
                "No app key provided. Use --dropbox-app-key or set auth.app_key in config.yaml"
            );
        }

        let connector = ctx.connector();
        connector.login().context("Dropbox login failed")?;

        let account = connector
            .current_account()
            .context("Failed to retrieve account information")?
            .context("Login produced no token")?;
        info!(account_id = %account.account_id, "Logged in");

        if ctx.format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "account_id": account.account_id,
                "display_name": account.name.display_name,
                "email": account.email,
            }));
        } else {
            fmt.success(&format!(
                "Authenticated as {} ({})",
                account.name.display_name,
                account.email.as_deref().unwrap_or("no email")
            ));
        }
        Ok(())
    }

    fn execute_logout(&self, ctx: &Context) -> Result<()> {
        ctx.connector()
            .logout()
            .context("Failed to remove stored credentials")?;
        info!("Logged out");
        ctx.formatter().success("Stored Dropbox credentials removed");
        Ok(())
    }

    fn execute_status(&self, ctx: &Context) -> Result<()> {
        let fmt = ctx.formatter();
        let json = ctx.format == OutputFormat::Json;

        match ctx.connector().current_account() {
            Ok(Some(account)) => {
                if json {
                    fmt.print_json(&serde_json::json!({
                        "authenticated": true,
                        "account_id": account.account_id,
                        "display_name": account.name.display_name,
                        "email": account.email,
                    }));
                } else {
                    fmt.success(&format!("Authenticated as {}", account.name.display_name));
                    if let Some(email) = &account.email {
                        fmt.info(&format!("Email: {email}"));
                    }
                    fmt.info(&format!("Account ID: {}", account.account_id));
                }
            }
            Ok(None) => {
                if json {
                    fmt.print_json(&serde_json::json!({ "authenticated": false }));
                } else {
                    fmt.warn("Not authenticated. Run 'overcloud auth login' first.");
                }
            }
            Err(e) => {
                if json {
                    fmt.print_json(&serde_json::json!({
                        "authenticated": false,
                        "error": format!("{e:#}"),
                    }));
                } else {
                    fmt.error(&format!("Stored credentials are not usable: {e:#}"));
                }
            }
        }
        Ok(())
    }
}
