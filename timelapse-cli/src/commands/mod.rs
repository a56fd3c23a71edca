//! CLI command implementations

mod config;
mod generate;
mod list;
mod serve;

pub use config::{config, ConfigArgs};
pub use generate::generate;
pub use list::list;
pub use serve::serve;

use anyhow::{Context, Result};
use std::path::PathBuf;
use timelapse_core::config::ConfigFile;
use tracing::debug;

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub cron_spec: Option<String>,
    pub port: Option<u16>,
}

impl Settings {
    /// Load the config file and apply command-line overrides on top
    pub fn load(&self) -> Result<ConfigFile> {
        let mut config = ConfigFile::load_from(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))?;

        if let Some(cron_spec) = &self.cron_spec {
            debug!("Schedule overridden from command line: {}", cron_spec);
            config.server.cron_spec = cron_spec.clone();
        }
        if let Some(port) = self.port {
            debug!("Port overridden from command line: {}", port);
            config.server.port = port;
        }

        // Overrides have to pass the same checks as the file
        config
            .validate()
            .context("Invalid configuration after applying command-line options")?;

        Ok(config)
    }
}

/// Shorten `s` to at most `max` characters for table output
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
