//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use launch_lib::{
    forecast::{ForecastProvider, ImputationStrategy},
    health::{ComponentStatus, HealthRegistry},
    models::site_column,
    observability::{PredictorMetrics, StructuredLogger},
    predictor::{Artifacts, InferencePipeline},
    LaunchAdvisor, LaunchSite, PredictorError, SiteRegistry,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// A loaded artifact triple and the advisor built on it
pub struct LoadedModel {
    pub model_id: String,
    pub advisor: LaunchAdvisor,
}

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
    pub sites: SiteRegistry,
    pub model: Option<LoadedModel>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
        sites: SiteRegistry,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            sites,
            model: None,
        }
    }

    /// Attach loaded artifacts; prediction routes answer 503 until this is called
    pub fn with_model(
        mut self,
        model_id: impl Into<String>,
        artifacts: Arc<Artifacts>,
        provider: Arc<dyn ForecastProvider>,
        strategy: ImputationStrategy,
    ) -> Self {
        let advisor = LaunchAdvisor::new(self.sites.clone(), provider, artifacts, strategy);
        self.model = Some(LoadedModel {
            model_id: model_id.into(),
            advisor,
        });
        self
    }

    fn model(&self) -> Result<&LoadedModel, ApiError> {
        self.model.as_ref().ok_or(ApiError::ModelNotLoaded)
    }
}

/// Error body returned by the prediction routes
#[derive(Debug)]
pub enum ApiError {
    ModelNotLoaded,
    Predictor(PredictorError),
}

impl From<PredictorError> for ApiError {
    fn from(e: PredictorError) -> Self {
        Self::Predictor(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::ModelNotLoaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model_not_loaded",
                "model artifacts are not loaded".to_string(),
            ),
            ApiError::Predictor(e) => {
                let status = match &e {
                    PredictorError::SchemaMismatch { .. } | PredictorError::SiteNotInSchema { .. } => {
                        StatusCode::CONFLICT
                    }
                    PredictorError::SiteNotFound { .. } => StatusCode::NOT_FOUND,
                    PredictorError::ForecastUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    PredictorError::Forecast(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind(), e.to_string())
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub features: HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: u8,
    pub suitable: bool,
    pub probabilities: [f64; 2],
    pub confidence: f64,
    pub model_id: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub model_id: String,
    pub features: Vec<String>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Predict from a caller-supplied feature mapping
async fn predict_features(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let model = state.model()?;
    let artifacts = model.advisor.artifacts();
    let pipeline = InferencePipeline::new();
    let mut features = request.features;

    let start = Instant::now();
    let result = match request.site.as_deref() {
        Some(site) => {
            features.entry(site_column(site)).or_insert(1.0);
            pipeline.predict_for_site(site, &features, artifacts)
        }
        None => pipeline.predict(&features, artifacts),
    };
    state.metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
    state.health_registry.record_prediction(&result, false).await;

    let prediction = result.map_err(|e| {
        state.metrics.inc_prediction_errors(e.kind());
        state
            .logger
            .log_prediction_failed(request.site.as_deref(), e.kind(), &e.to_string());
        e
    })?;

    state.metrics.inc_predictions_generated(&prediction);
    state
        .logger
        .log_prediction(request.site.as_deref(), None, &prediction, &model.model_id);

    Ok(Json(PredictResponse {
        label: prediction.label,
        suitable: prediction.is_suitable(),
        probabilities: prediction.probabilities,
        confidence: prediction.confidence(),
        model_id: model.model_id.clone(),
    }))
}

/// Predict from the live forecast for a site and date
async fn predict_forecast(
    State(state): State<Arc<AppState>>,
    Path((site, date)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let model = state.model()?;

    let start = Instant::now();
    let result = model.advisor.assess(&site, &date).await;
    state.metrics.observe_forecast_latency(start.elapsed().as_secs_f64());
    state.health_registry.record_prediction(&result, true).await;

    match result {
        Ok(assessment) => {
            state.metrics.inc_predictions_generated(&assessment.prediction);
            state
                .logger
                .log_prediction(Some(&site), Some(&date), &assessment.prediction, &model.model_id);
            Ok(Json(assessment).into_response())
        }
        Err(e) => {
            if matches!(e, PredictorError::Forecast(_)) {
                state.metrics.inc_forecast_errors();
            }
            state.metrics.inc_prediction_errors(e.kind());
            state.logger.log_prediction_failed(Some(&site), e.kind(), &e.to_string());
            Err(e.into())
        }
    }
}

async fn schema(State(state): State<Arc<AppState>>) -> Result<Json<SchemaResponse>, ApiError> {
    let model = state.model()?;
    Ok(Json(SchemaResponse {
        model_id: model.model_id.clone(),
        features: model.advisor.artifacts().schema.names().to_vec(),
    }))
}

async fn sites(State(state): State<Arc<AppState>>) -> Json<Vec<LaunchSite>> {
    Json(state.sites.sites())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/v1/predict", post(predict_features))
        .route("/v1/predict/:site/:date", get(predict_forecast))
        .route("/v1/schema", get(schema))
        .route("/v1/sites", get(sites))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
