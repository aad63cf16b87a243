//! Historical weather/launch-suitability dataset loading
//!
//! Reads the CSV export of past launch-window observations. The timestamp
//! column is validated and then discarded; the site column is kept as a
//! category for one-hot encoding; every other column except the label is a
//! numeric measurement.

use crate::error::{PredictorError, Result};
use crate::models::{site_column, HistoricalRecord, DATETIME_COLUMN, LABEL_COLUMN, SITE_COLUMN};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Historical records plus the numeric column names in file order
#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    numeric_columns: Vec<String>,
    records: Vec<HistoricalRecord>,
}

impl HistoricalDataset {
    /// Build a dataset from already-parsed records
    pub fn new(numeric_columns: Vec<String>, records: Vec<HistoricalRecord>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            if record.measurements.len() != numeric_columns.len() {
                return Err(PredictorError::dataset(
                    i + 1,
                    "*",
                    format!(
                        "expected {} measurements, got {}",
                        numeric_columns.len(),
                        record.measurements.len()
                    ),
                ));
            }
            if record.suitable_for_launch > 1 {
                return Err(PredictorError::dataset(i + 1, LABEL_COLUMN, "label must be 0 or 1"));
            }
        }
        Ok(Self {
            numeric_columns,
            records,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            sites = dataset.sites().len(),
            "Loaded historical dataset"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let label_idx = position(LABEL_COLUMN).ok_or_else(|| PredictorError::SchemaDerivation {
            reason: format!("dataset has no '{}' label column", LABEL_COLUMN),
        })?;
        let site_idx = position(SITE_COLUMN).ok_or_else(|| PredictorError::SchemaDerivation {
            reason: format!("dataset has no '{}' column", SITE_COLUMN),
        })?;
        let datetime_idx = position(DATETIME_COLUMN);

        let numeric: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx && *i != site_idx && Some(*i) != datetime_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let row = row + 1;
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let timestamp = match datetime_idx {
                Some(idx) => Some(parse_timestamp(field(idx)).ok_or_else(|| {
                    PredictorError::dataset(row, DATETIME_COLUMN, format!("invalid timestamp '{}'", field(idx)))
                })?),
                None => None,
            };

            let launch_site = field(site_idx).to_string();
            if launch_site.is_empty() {
                return Err(PredictorError::dataset(row, SITE_COLUMN, "empty launch site"));
            }

            let measurements = numeric
                .iter()
                .map(|(idx, name)| {
                    parse_number(field(*idx)).ok_or_else(|| {
                        PredictorError::dataset(row, name.as_str(), format!("not a number: '{}'", field(*idx)))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let suitable_for_launch = match parse_number(field(label_idx)) {
                Some(v) if v == 0.0 => 0,
                Some(v) if v == 1.0 => 1,
                _ => {
                    return Err(PredictorError::dataset(
                        row,
                        LABEL_COLUMN,
                        format!("label must be 0 or 1, got '{}'", field(label_idx)),
                    ))
                }
            };

            records.push(HistoricalRecord {
                timestamp,
                launch_site,
                measurements,
                suitable_for_launch,
            });
        }

        debug!(rows = records.len(), numeric_columns = numeric.len(), "Parsed dataset CSV");

        Ok(Self {
            numeric_columns: numeric.into_iter().map(|(_, name)| name).collect(),
            records,
        })
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct launch sites in lexicographic order
    pub fn sites(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.launch_site.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// A record as a raw feature mapping, with its site indicator set
    pub fn raw_features(&self, record: &HistoricalRecord) -> HashMap<String, f64> {
        let mut raw: HashMap<String, f64> = self
            .numeric_columns
            .iter()
            .cloned()
            .zip(record.measurements.iter().copied())
            .collect();
        raw.insert(site_column(&record.launch_site), 1.0);
        raw
    }

    /// Number of rows labelled (not suitable, suitable)
    pub fn class_counts(&self) -> (usize, usize) {
        let positive = self.records.iter().filter(|r| r.suitable_for_launch == 1).count();
        (self.records.len() - positive, positive)
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_number(value: &str) -> Option<f64> {
    match value {
        "True" | "true" | "TRUE" => Some(1.0),
        "False" | "false" | "FALSE" => Some(0.0),
        _ => value.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}
