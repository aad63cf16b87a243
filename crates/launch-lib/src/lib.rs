//! Launch-weather suitability prediction
//!
//! This crate provides the core functionality for:
//! - Loading historical weather/launch records
//! - Training a random forest against a frozen feature schema
//! - Persisting and loading the (scaler, classifier, schema) triple
//! - Adapting live forecasts into schema-aligned features
//! - Health checks and observability for the serving agent

pub mod artifacts;
pub mod dataset;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod sites;

pub use artifacts::{ArtifactStore, SavedArtifacts};
pub use dataset::HistoricalDataset;
pub use error::{PredictorError, Result};
pub use health::{Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use service::{evaluate_dataset, train, LaunchAdvisor};
pub use sites::{LaunchSite, SiteRegistry};
