//! Observability for the prediction service
//!
//! Prometheus metrics registered once in the default registry, plus a
//! `StructuredLogger` that emits the domain events with consistent fields.

use crate::artifacts::SavedArtifacts;
use crate::models::Prediction;
use crate::predictor::TrainingOutcome;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec, GaugeVec, Histogram,
    IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds; inference on a loaded forest is sub-millisecond
/// while a full forecast lookup is dominated by two HTTP round trips
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    forecast_latency_seconds: Histogram,
    predictions_generated: IntCounterVec,
    prediction_errors: IntCounterVec,
    forecast_errors: IntCounter,
    model_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "launchcast_prediction_latency_seconds",
                "Time spent aligning, scaling and classifying one feature vector",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            forecast_latency_seconds: register_histogram!(
                "launchcast_forecast_latency_seconds",
                "Time spent fetching forecast periods for a site",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register forecast_latency_seconds"),

            predictions_generated: register_int_counter_vec!(
                "launchcast_predictions_generated_total",
                "Total number of predictions generated",
                &["label"]
            )
            .expect("Failed to register predictions_generated"),

            prediction_errors: register_int_counter_vec!(
                "launchcast_prediction_errors_total",
                "Total number of failed predictions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors"),

            forecast_errors: register_int_counter!(
                "launchcast_forecast_errors_total",
                "Total number of failed forecast fetches"
            )
            .expect("Failed to register forecast_errors"),

            model_info: register_gauge_vec!(
                "launchcast_model_info",
                "Information about the currently loaded model",
                &["model_id", "trees", "features"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide prediction metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_forecast_latency(&self, duration_secs: f64) {
        self.inner().forecast_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_generated(&self, prediction: &Prediction) {
        let label = if prediction.is_suitable() { "suitable" } else { "not_suitable" };
        self.inner().predictions_generated.with_label_values(&[label]).inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_forecast_errors(&self) {
        self.inner().forecast_errors.inc();
    }

    /// Replace the model info series with the given model
    pub fn set_model_info(&self, model_id: &str, trees: usize, features: usize) {
        let gauge = &self.inner().model_info;
        gauge.reset();
        gauge
            .with_label_values(&[model_id, &trees.to_string(), &features.to_string()])
            .set(1.0);
    }
}

/// Structured logger for domain events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_training_completed(&self, outcome: &TrainingOutcome) {
        info!(
            event = "training_completed",
            instance = %self.instance,
            best_params = %outcome.search.best_params,
            cv_accuracy = outcome.search.best_score,
            test_accuracy = outcome.evaluation.accuracy,
            auc = outcome.evaluation.auc,
            train_rows = outcome.train_rows,
            test_rows = outcome.test_rows,
            features = outcome.schema.len(),
            "Model training completed"
        );
    }

    pub fn log_artifacts_saved(&self, saved: &SavedArtifacts) {
        info!(
            event = "artifacts_saved",
            instance = %self.instance,
            model_id = %saved.model_id(),
            scaler = %saved.scaler.path.display(),
            classifier = %saved.classifier.path.display(),
            schema = %saved.schema.path.display(),
            "Model artifacts saved"
        );
    }

    pub fn log_prediction(&self, site: Option<&str>, date: Option<&str>, prediction: &Prediction, model_id: &str) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            site = site.unwrap_or("-"),
            date = date.unwrap_or("-"),
            label = prediction.label,
            suitable = prediction.is_suitable(),
            confidence = prediction.confidence(),
            model_id = %model_id,
            "Generated launch prediction"
        );
    }

    pub fn log_prediction_failed(&self, site: Option<&str>, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            site = site.unwrap_or("-"),
            kind = %kind,
            error = %error,
            "Launch prediction failed"
        );
    }

    pub fn log_startup(&self, version: &str, model_id: &str) {
        info!(
            event = "startup",
            instance = %self.instance,
            version = %version,
            model_id = %model_id,
            "Launchcast agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            instance = %self.instance,
            reason = %reason,
            "Launchcast agent shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = PredictorMetrics::new();
        let prediction = Prediction {
            label: 1,
            probabilities: [0.2, 0.8],
        };

        metrics.observe_prediction_latency(0.0004);
        metrics.observe_forecast_latency(0.3);
        metrics.inc_predictions_generated(&prediction);
        metrics.inc_prediction_errors("schema_mismatch");
        metrics.inc_forecast_errors();
        metrics.set_model_info("abc123def456", 100, 10);

        let again = PredictorMetrics::new();
        again.set_model_info("0123456789ab", 200, 10);

        let families = prometheus::gather();
        let info = families
            .iter()
            .find(|f| f.get_name() == "launchcast_model_info")
            .expect("model info registered");
        assert_eq!(info.get_metric().len(), 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("agent-0");
        assert_eq!(logger.instance, "agent-0");
    }
}
