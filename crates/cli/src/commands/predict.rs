//! Live-forecast prediction command

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use launch_lib::forecast::{ImputationStrategy, NwsClient, NwsConfig, DEFAULT_NWS_URL};
use launch_lib::{ArtifactStore, LaunchAdvisor, LaunchAssessment, StructuredLogger};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;

use crate::config::Config;
use crate::output::{color_confidence, color_label, format_percent, print_json, print_table, print_warning, OutputFormat};

/// How to fill humidity and visibility, which the forecast does not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Imputation {
    /// Training-set means stored in the scaler
    TrainingMean,
    /// The --humidity and --visibility values
    Constant,
    /// Random values from a seeded generator
    SeededRandom,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Launch site name, e.g. "Cape Canaveral"
    pub site: String,

    /// Date as YYYY-MM-DD
    pub date: String,

    /// Imputation strategy for unobserved features
    #[arg(long, value_enum, default_value = "training-mean")]
    pub imputation: Imputation,

    /// Humidity (%) for constant imputation
    #[arg(long, default_value_t = 70.0)]
    pub humidity: f64,

    /// Visibility (km) for constant imputation
    #[arg(long, default_value_t = 10.0)]
    pub visibility: f64,

    /// Seed for seeded-random imputation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Forecast API base URL
    #[arg(long, env = "LAUNCHCAST_FORECAST_URL")]
    pub forecast_url: Option<String>,

    /// Forecast request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl PredictArgs {
    fn strategy(&self) -> ImputationStrategy {
        match self.imputation {
            Imputation::TrainingMean => ImputationStrategy::TrainingMean,
            Imputation::Constant => ImputationStrategy::Constant {
                humidity: self.humidity,
                visibility: self.visibility,
            },
            Imputation::SeededRandom => ImputationStrategy::SeededRandom { seed: self.seed },
        }
    }
}

/// Row for the forecast conditions table
#[derive(Tabled, Serialize)]
struct ConditionRow {
    #[tabled(rename = "Condition")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}

fn print_assessment(assessment: &LaunchAssessment, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(assessment);
        return;
    }

    println!(
        "{} on {} ({}: {})",
        assessment.site, assessment.date, assessment.period.start_time, assessment.period.short_forecast
    );

    let rows = vec![
        ConditionRow {
            name: "Temperature",
            value: format!("{:.1} °C", assessment.temperature_c),
        },
        ConditionRow {
            name: "Wind speed",
            value: format!("{:.1} km/h ({})", assessment.wind_speed_kmh, assessment.period.wind_speed),
        },
        ConditionRow {
            name: "Cloud cover",
            value: format!("{:.0}%", assessment.cloud_cover_pct),
        },
        ConditionRow {
            name: "Rain",
            value: yes_no(assessment.rain),
        },
        ConditionRow {
            name: "Thunderstorm",
            value: yes_no(assessment.thunderstorm),
        },
        ConditionRow {
            name: "P(suitable)",
            value: format_percent(assessment.prediction.probabilities[1]),
        },
    ];
    print_table(&rows, format);

    println!(
        "Verdict: {} (confidence {})",
        color_label(assessment.prediction.label),
        color_confidence(assessment.prediction.confidence())
    );
}

pub async fn run(args: &PredictArgs, artifact_dir: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    if NaiveDate::parse_from_str(&args.date, "%Y-%m-%d").is_err() {
        bail!("Invalid date '{}': expected YYYY-MM-DD", args.date);
    }

    let sites = config.site_registry();
    if !sites.contains(&args.site) {
        let known: Vec<String> = sites.sites().into_iter().map(|s| s.name).collect();
        bail!("Unknown launch site '{}'. Known sites: {}", args.site, known.join(", "));
    }

    let artifacts = ArtifactStore::new(artifact_dir)
        .load()
        .with_context(|| format!("Failed to load artifacts from {}", artifact_dir.display()))?;

    let strategy = args.strategy();
    if matches!(strategy, ImputationStrategy::SeededRandom { .. }) && format == OutputFormat::Table {
        print_warning("Humidity and visibility are random draws, not observations; results depend on --seed");
    }

    let base_url = args
        .forecast_url
        .clone()
        .or_else(|| config.forecast_url.clone())
        .unwrap_or_else(|| DEFAULT_NWS_URL.to_string());
    let provider = NwsClient::new(NwsConfig {
        base_url,
        timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    })?;

    let advisor = LaunchAdvisor::new(sites, Arc::new(provider), Arc::new(artifacts), strategy);
    let assessment = advisor
        .assess(&args.site, &args.date)
        .await
        .with_context(|| format!("Prediction for {} on {} failed", args.site, args.date))?;

    StructuredLogger::new("lcast").log_prediction(
        Some(&args.site),
        Some(&args.date),
        &assessment.prediction,
        "local",
    );

    print_assessment(&assessment, format);
    Ok(())
}
