//! Agent configuration

use anyhow::{bail, Context, Result};
use launch_lib::forecast::{ImputationStrategy, NwsConfig, DEFAULT_NWS_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration, read from `LAUNCHCAST_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the trained artifact triple
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_forecast_timeout")]
    pub forecast_timeout_secs: u64,

    /// One of `training_mean`, `constant`, `seeded_random`
    #[serde(default = "default_imputation")]
    pub imputation: String,

    #[serde(default = "default_imputation_humidity")]
    pub imputation_humidity: f64,

    #[serde(default = "default_imputation_visibility")]
    pub imputation_visibility: f64,

    #[serde(default = "default_imputation_seed")]
    pub imputation_seed: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "launchcast-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_forecast_base_url() -> String {
    DEFAULT_NWS_URL.to_string()
}

fn default_user_agent() -> String {
    NwsConfig::default().user_agent
}

fn default_forecast_timeout() -> u64 {
    30
}

fn default_imputation() -> String {
    "training_mean".to_string()
}

fn default_imputation_humidity() -> f64 {
    70.0
}

fn default_imputation_visibility() -> f64 {
    10.0
}

fn default_imputation_seed() -> u64 {
    42
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            artifact_dir: default_artifact_dir(),
            forecast_base_url: default_forecast_base_url(),
            user_agent: default_user_agent(),
            forecast_timeout_secs: default_forecast_timeout(),
            imputation: default_imputation(),
            imputation_humidity: default_imputation_humidity(),
            imputation_visibility: default_imputation_visibility(),
            imputation_seed: default_imputation_seed(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("LAUNCHCAST").try_parsing(true))
            .build()?;

        let loaded: Self = config
            .try_deserialize()
            .context("invalid LAUNCHCAST_* configuration")?;
        loaded.imputation_strategy()?;
        Ok(loaded)
    }

    pub fn imputation_strategy(&self) -> Result<ImputationStrategy> {
        Ok(match self.imputation.as_str() {
            "training_mean" => ImputationStrategy::TrainingMean,
            "constant" => ImputationStrategy::Constant {
                humidity: self.imputation_humidity,
                visibility: self.imputation_visibility,
            },
            "seeded_random" => ImputationStrategy::SeededRandom {
                seed: self.imputation_seed,
            },
            other => bail!(
                "unknown imputation strategy '{}' (expected training_mean, constant or seeded_random)",
                other
            ),
        })
    }

    pub fn nws_config(&self) -> NwsConfig {
        NwsConfig {
            base_url: self.forecast_base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.forecast_timeout_secs),
        }
    }
}
