//! Configuration management for the CLI

use anyhow::{Context, Result};
use launch_lib::{LaunchSite, SiteRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default artifact directory
    pub artifact_dir: Option<PathBuf>,
    /// Forecast API base URL override
    pub forecast_url: Option<String>,
    /// Launch sites added to (or overriding) the built-in table
    #[serde(default)]
    pub sites: Vec<LaunchSite>,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Built-in sites plus any configured ones
    pub fn site_registry(&self) -> SiteRegistry {
        let mut registry = SiteRegistry::default();
        for site in &self.sites {
            registry.insert(site.name.clone(), site.coordinates);
        }
        registry
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("launchcast").join("config.json"))
    }
}
