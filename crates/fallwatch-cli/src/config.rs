//! `fallwatch config`: create, show and check configuration files.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::settings::AppConfig;

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a configuration file with every default filled in
    Init {
        /// Destination file
        #[arg(default_value = "fallwatch.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file (defaults when omitted)
        path: Option<PathBuf>,
    },

    /// Check a configuration file
    Validate {
        /// Configuration file
        path: PathBuf,
    },
}

/// Execute a config command
pub async fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("{} Wrote {}", "[OK]".green().bold(), path.display());
        }
        ConfigCommand::Show { path } => {
            let config = AppConfig::load(path.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Validate { path } => {
            AppConfig::load(Some(&path))?;
            println!("{} {} is valid", "[OK]".green().bold(), path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fallwatch.json");

        execute(ConfigCommand::Init { path: path.clone(), force: false }).await.unwrap();
        assert!(AppConfig::load(Some(&path)).is_ok());

        assert!(execute(ConfigCommand::Init { path: path.clone(), force: false }).await.is_err());
        execute(ConfigCommand::Init { path: path.clone(), force: true }).await.unwrap();
        execute(ConfigCommand::Validate { path }).await.unwrap();
    }
}
