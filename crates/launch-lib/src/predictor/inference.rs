//! Schema-aligned inference against a loaded artifact triple

use super::forest::RandomForest;
use super::scaler::StandardScaler;
use super::schema::FeatureSchema;
use super::trainer::label_for;
use super::Classifier;
use crate::error::{PredictorError, Result};
use crate::models::{Prediction, SITE_PREFIX};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Matched (scaler, classifier, schema) produced by one training run
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
    pub schema: FeatureSchema,
}

impl Artifacts {
    pub fn new(scaler: StandardScaler, classifier: RandomForest, schema: FeatureSchema) -> Self {
        Self {
            scaler,
            classifier,
            schema,
        }
    }

    /// Fail if the scaler or classifier expect a different width than the schema
    pub fn check_consistency(&self) -> Result<()> {
        if self.scaler.n_features() != self.schema.len() {
            return Err(PredictorError::SchemaMismatch {
                component: "scaler",
                expected: self.scaler.n_features(),
                actual: self.schema.len(),
            });
        }
        if self.classifier.n_features() != self.schema.len() {
            return Err(PredictorError::SchemaMismatch {
                component: "classifier",
                expected: self.classifier.n_features(),
                actual: self.schema.len(),
            });
        }
        Ok(())
    }

    /// Training-partition mean of each schema column, recovered from the scaler
    pub fn training_means(&self) -> HashMap<String, f64> {
        self.schema.to_map(self.scaler.mean())
    }

    /// Feature importances paired with schema names, most important first
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .schema
            .names()
            .iter()
            .cloned()
            .zip(self.classifier.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Stateless align → scale → classify pipeline.
///
/// Holds no mutable state; concurrent calls may share one `Artifacts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferencePipeline;

impl InferencePipeline {
    pub fn new() -> Self {
        Self
    }

    /// Align `raw` to the schema and classify it.
    ///
    /// Non-site names missing from the schema are ignored and missing schema
    /// columns are zero-filled, but a `LaunchSite_*` indicator the schema
    /// lacks is an error: dropping it would score the row as if no site were
    /// selected.
    pub fn predict(&self, raw: &HashMap<String, f64>, artifacts: &Artifacts) -> Result<Prediction> {
        let start = Instant::now();
        artifacts.check_consistency()?;
        if let Some(column) = raw
            .keys()
            .find(|name| name.starts_with(SITE_PREFIX) && !artifacts.schema.contains(name))
        {
            return Err(PredictorError::SiteNotInSchema {
                site: column[SITE_PREFIX.len()..].to_string(),
                column: column.clone(),
            });
        }

        let aligned = artifacts.schema.align(raw);
        let scaled = artifacts.scaler.transform(&aligned)?;
        let probabilities = artifacts.classifier.predict_proba(&scaled)?;
        let label = label_for(probabilities);

        debug!(
            label,
            p_suitable = probabilities[1],
            elapsed_us = start.elapsed().as_micros() as u64,
            "Inference completed"
        );

        Ok(Prediction { label, probabilities })
    }

    /// Predict for a named site, refusing sites the model never saw even when
    /// `raw` carries no indicator for it.
    pub fn predict_for_site(&self, site: &str, raw: &HashMap<String, f64>, artifacts: &Artifacts) -> Result<Prediction> {
        if artifacts.schema.site_column(site).is_none() {
            return Err(PredictorError::SiteNotInSchema {
                site: site.to_string(),
                column: crate::models::site_column(site),
            });
        }
        self.predict(raw, artifacts)
    }
}
