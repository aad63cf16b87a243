//! Ordered feature vocabulary shared by training and inference

use crate::dataset::HistoricalDataset;
use crate::error::{PredictorError, Result};
use crate::models::{site_column, SITE_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The frozen, ordered list of feature columns a trained model expects.
///
/// Numeric weather columns come first in dataset order, followed by one
/// `LaunchSite_<site>` indicator per site seen at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Derive the schema from the one-hot encoded dataset columns
    pub fn derive(dataset: &HistoricalDataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(PredictorError::SchemaDerivation {
                reason: "dataset has zero rows".to_string(),
            });
        }
        let mut columns = dataset.numeric_columns().to_vec();
        columns.extend(dataset.sites().iter().map(|s| site_column(s)));
        Ok(Self { columns })
    }

    /// Encode a dataset row into schema order
    pub fn encode(&self, measurements: &[f64], site: &str) -> Vec<f64> {
        let indicator = site_column(site);
        let mut row: Vec<f64> = measurements.to_vec();
        row.extend(
            self.columns[measurements.len().min(self.columns.len())..]
                .iter()
                .map(|c| if *c == indicator { 1.0 } else { 0.0 }),
        );
        row
    }

    /// Reconcile an unordered feature mapping into schema order.
    ///
    /// Names absent from the schema are ignored. Schema columns absent from
    /// `raw` are filled with `0.0`; this zero-fill is the contract for sparse
    /// inputs (for example unselected site indicators) and never errors.
    pub fn align(&self, raw: &HashMap<String, f64>) -> Vec<f64> {
        self.columns
            .iter()
            .map(|name| raw.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Inverse of `align` for an already-ordered vector
    pub fn to_map(&self, values: &[f64]) -> HashMap<String, f64> {
        self.columns.iter().cloned().zip(values.iter().copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Indicator column for `site`, if the site was seen at training time
    pub fn site_column(&self, site: &str) -> Option<&str> {
        let column = site_column(site);
        self.columns.iter().find(|c| **c == column).map(String::as_str)
    }

    /// Sites that have an indicator column
    pub fn sites(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix(SITE_PREFIX))
            .collect()
    }
}
