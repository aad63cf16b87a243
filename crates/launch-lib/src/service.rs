//! End-to-end train and predict entry points

use crate::artifacts::{ArtifactStore, SavedArtifacts};
use crate::dataset::HistoricalDataset;
use crate::error::{PredictorError, Result};
use crate::forecast::{select_period, ForecastAdapter, ForecastProvider, ImputationStrategy};
use crate::models::{
    LaunchAssessment, CLOUD_COVER_PCT, RAIN_FLAG, TEMPERATURE_C, THUNDERSTORM_FLAG, WIND_SPEED_KMH,
};
use crate::predictor::{evaluate, Artifacts, Evaluation, InferencePipeline, Trainer, TrainerConfig, TrainingOutcome};
use crate::sites::SiteRegistry;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Train on `dataset` and persist the resulting triple into `store`
pub fn train(
    dataset: &HistoricalDataset,
    config: TrainerConfig,
    store: &ArtifactStore,
) -> Result<(TrainingOutcome, SavedArtifacts)> {
    let outcome = Trainer::new(config).fit(dataset)?;
    let saved = store.save(&outcome.scaler, &outcome.classifier, &outcome.schema)?;
    Ok((outcome, saved))
}

/// Score saved artifacts against a labelled dataset.
///
/// Rows go through the same align and scale steps as live predictions; a
/// site missing from the schema fails rather than being zero-filled.
pub fn evaluate_dataset(dataset: &HistoricalDataset, artifacts: &Artifacts) -> Result<Evaluation> {
    artifacts.check_consistency()?;
    if dataset.is_empty() {
        return Err(PredictorError::insufficient("evaluation dataset has no rows"));
    }

    let mut x = Vec::with_capacity(dataset.len());
    let mut y = Vec::with_capacity(dataset.len());
    for record in dataset.records() {
        if artifacts.schema.site_column(&record.launch_site).is_none() {
            return Err(PredictorError::SiteNotInSchema {
                site: record.launch_site.clone(),
                column: crate::models::site_column(&record.launch_site),
            });
        }
        let aligned = artifacts.schema.align(&dataset.raw_features(record));
        x.push(artifacts.scaler.transform(&aligned)?);
        y.push(record.suitable_for_launch);
    }

    let evaluation = evaluate(&artifacts.classifier, &x, &y)?;
    info!(rows = y.len(), accuracy = evaluation.accuracy, auc = evaluation.auc, "Evaluated artifacts");
    Ok(evaluation)
}

/// Predicts launch suitability for a site and date from a live forecast
pub struct LaunchAdvisor {
    sites: SiteRegistry,
    provider: Arc<dyn ForecastProvider>,
    artifacts: Arc<Artifacts>,
    adapter: ForecastAdapter,
    pipeline: InferencePipeline,
}

impl LaunchAdvisor {
    pub fn new(
        sites: SiteRegistry,
        provider: Arc<dyn ForecastProvider>,
        artifacts: Arc<Artifacts>,
        strategy: ImputationStrategy,
    ) -> Self {
        let adapter = ForecastAdapter::for_artifacts(strategy, &artifacts);
        Self {
            sites,
            provider,
            artifacts,
            adapter,
            pipeline: InferencePipeline::new(),
        }
    }

    pub fn sites(&self) -> &SiteRegistry {
        &self.sites
    }

    pub fn artifacts(&self) -> &Arc<Artifacts> {
        &self.artifacts
    }

    /// Assess `site` on `date`, a `YYYY-MM-DD` calendar date matched against
    /// the period start times.
    ///
    /// The site and the date are both checked before any forecast request is
    /// made.
    pub async fn assess(&self, site: &str, date: &str) -> Result<LaunchAssessment> {
        let coordinates = self.sites.resolve(site)?;
        if date.len() != 10 || NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
            return Err(PredictorError::ForecastUnavailable {
                site: site.to_string(),
                date: date.to_string(),
                reason: "date must be formatted as YYYY-MM-DD".to_string(),
            });
        }
        let periods = self.provider.periods(coordinates).await?;
        debug!(site = %site, periods = periods.len(), "Selecting forecast period");

        let period = select_period(&periods, date).ok_or_else(|| PredictorError::ForecastUnavailable {
            site: site.to_string(),
            date: date.to_string(),
            reason: format!("none of {} forecast periods starts on that date", periods.len()),
        })?;

        let raw = self.adapter.adapt(period, site)?;
        let prediction = self.pipeline.predict_for_site(site, &raw, &self.artifacts)?;

        info!(
            site = %site,
            date = %date,
            label = prediction.label,
            p_suitable = prediction.probabilities[1],
            "Launch assessment complete"
        );

        Ok(LaunchAssessment {
            site: site.to_string(),
            date: date.to_string(),
            period: period.clone(),
            temperature_c: raw[TEMPERATURE_C],
            wind_speed_kmh: raw[WIND_SPEED_KMH],
            cloud_cover_pct: raw[CLOUD_COVER_PCT],
            rain: raw[RAIN_FLAG] > 0.0,
            thunderstorm: raw[THUNDERSTORM_FLAG] > 0.0,
            prediction,
        })
    }
}
