//! Application configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use fallwatch_alerting::{AlertConfig, JournalConfig};
use fallwatch_risk::RiskConfig;
use serde::{Deserialize, Serialize};

/// Runtime knobs that belong to the binary rather than a library crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interval at which reminders and heartbeats are checked while waiting
    /// for samples.
    pub poll_interval_ms: u64,

    /// Print notifications to the terminal.
    pub console_notifications: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            console_notifications: true,
        }
    }
}

/// Complete on-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub risk: RiskConfig,
    pub alerting: AlertConfig,
    pub journal: JournalConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Loads `path`, or the defaults when no path is given. Always validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.risk.validate().context("invalid risk configuration")?;
        self.alerting.validate().context("invalid alerting configuration")?;
        self.journal.validate().context("invalid journal configuration")?;
        if self.runtime.poll_interval_ms == 0 {
            anyhow::bail!("invalid runtime configuration: poll_interval_ms must be > 0");
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing config {}", path.display()))
    }
}
