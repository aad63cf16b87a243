//! Error taxonomy for training, persistence and inference

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictorError>;

/// Errors surfaced by the train/serve pipeline.
///
/// None of these are retried internally: each indicates a structural problem
/// (bad data, mismatched artifacts, unknown site) that must reach the caller.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("cannot derive feature schema: {reason}")]
    SchemaDerivation { reason: String },

    #[error("insufficient training data: {reason}")]
    InsufficientData { reason: String },

    #[error("artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("artifact corrupt: {}: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("schema mismatch in {component}: expected {expected} features, got {actual}")]
    SchemaMismatch {
        component: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("launch site '{site}' has no indicator column '{column}' in the trained schema")]
    SiteNotInSchema { site: String, column: String },

    #[error("unknown launch site '{site}'")]
    SiteNotFound { site: String },

    #[error("forecast unavailable for {site} on {date}: {reason}")]
    ForecastUnavailable {
        site: String,
        date: String,
        reason: String,
    },

    #[error("dataset error at row {row}, column '{column}': {reason}")]
    Dataset {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("forecast request failed: {0}")]
    Forecast(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PredictorError {
    pub(crate) fn dataset(row: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dataset {
            row,
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }

    /// Short machine-readable error kind, used for API responses and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaDerivation { .. } => "schema_derivation",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::ArtifactCorrupt { .. } => "artifact_corrupt",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::SiteNotInSchema { .. } => "site_not_in_schema",
            Self::SiteNotFound { .. } => "site_not_found",
            Self::ForecastUnavailable { .. } => "forecast_unavailable",
            Self::Dataset { .. } | Self::Csv(_) => "dataset",
            Self::Forecast(_) => "forecast",
            Self::Io(_) => "io",
        }
    }
}
