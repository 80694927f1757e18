//! Config command - Inspect the effective Overcloud configuration
//!
//! `show` prints the configuration after the command-line flags have been
//! applied; `validate` reports every problem found; `path` prints where the
//! file is read from.

use anyhow::{Context as _, Result};
use clap::Subcommand;

use super::Context;
use crate::output::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the effective configuration
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => {
                let path = ctx.config_path.display().to_string();
                match ctx.format {
                    OutputFormat::Json => ctx
                        .formatter()
                        .print_json(&serde_json::json!({ "config_path": path })),
                    OutputFormat::Human => println!("{path}"),
                }
                Ok(())
            }
        }
    }

    fn execute_show(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();

        if ctx.format == OutputFormat::Json {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&ctx.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let errors = ctx.config.validate();

        if ctx.format == OutputFormat::Json {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": ctx.config_path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
        } else {
            formatter.error(&format!("Found {} configuration error(s):", errors.len()));
            for error in &errors {
                formatter.info(&format!("{}: {}", error.field, error.message));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use overcloud_core::config::ConfigBuilder;

    use super::*;

    fn context(config: overcloud_core::config::Config) -> Context {
        Context {
            config,
            config_path: PathBuf::from("/etc/overcloud/config.yaml"),
            access_token: None,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let ctx = context(ConfigBuilder::new().build());
        assert!(ConfigCommand::Validate.execute(&ctx).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_remote_prefix() {
        let ctx = context(ConfigBuilder::new().remote_prefix("no-slash").build());
        assert!(ConfigCommand::Validate.execute(&ctx).is_err());
    }

    #[test]
    fn test_show_and_path_succeed() {
        let ctx = context(ConfigBuilder::new().build());
        assert!(ConfigCommand::Show.execute(&ctx).is_ok());
        assert!(ConfigCommand::Path.execute(&ctx).is_ok());
    }
}
