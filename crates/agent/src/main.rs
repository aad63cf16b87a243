//! Launchcast agent - launch-weather prediction service
//!
//! Loads the trained artifact triple and serves predictions from caller
//! features or from the live NWS forecast.

use anyhow::{Context, Result};
use launch_lib::{
    forecast::NwsClient,
    health::HealthRegistry,
    observability::{PredictorMetrics, StructuredLogger},
    ArtifactStore, SiteRegistry,
};
use launchcast_agent::{api, config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting launchcast-agent");

    let config = config::AgentConfig::load()?;
    let strategy = config.imputation_strategy()?;
    info!(
        instance = %config.instance_name,
        artifact_dir = %config.artifact_dir.display(),
        imputation = %strategy,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = PredictorMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    let provider = Arc::new(NwsClient::new(config.nws_config()).context("failed to create forecast client")?);

    let mut state = api::AppState::new(health_registry.clone(), metrics.clone(), logger.clone(), SiteRegistry::default());

    let store = ArtifactStore::new(&config.artifact_dir);
    let model_id = match store.load().and_then(|artifacts| Ok((store.checksums()?, artifacts))) {
        Ok((saved, artifacts)) => {
            let model_id = saved.model_id();
            metrics.set_model_info(&model_id, artifacts.classifier.trees().len(), artifacts.schema.len());
            state = state.with_model(model_id.clone(), Arc::new(artifacts), provider, strategy);
            health_registry.model_loaded(&model_id).await;
            model_id
        }
        Err(e) => {
            warn!(error = %e, dir = %store.dir().display(), "Artifacts unavailable; prediction routes disabled");
            health_registry.artifacts_unavailable(e.to_string()).await;
            "none".to_string()
        }
    };

    logger.log_startup(AGENT_VERSION, &model_id);

    let api_handle = tokio::spawn(api::serve(config.api_port, Arc::new(state)));

    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
