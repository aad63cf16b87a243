//! Component health for the prediction agent
//!
//! Three components are tracked: the artifact triple, the upstream forecast
//! provider and the inference path itself. The agent is ready once a model
//! is loaded and no component is unhealthy; a failing forecast provider only
//! degrades it, since feature-based predictions keep working.

use crate::error::{PredictorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parts of the agent reported by `/healthz`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Artifacts,
    Forecast,
    Predictor,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Artifacts, Component::Forecast, Component::Predictor];

    /// Component a failed prediction is charged to.
    ///
    /// Caller mistakes (unknown site, site outside the schema, bad or
    /// unmatched date) charge nothing.
    pub fn charged_for(error: &PredictorError) -> Option<Component> {
        match error {
            PredictorError::Forecast(_) => Some(Component::Forecast),
            PredictorError::SiteNotFound { .. }
            | PredictorError::SiteNotInSchema { .. }
            | PredictorError::ForecastUnavailable { .. } => None,
            _ => Some(Component::Predictor),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Artifacts => "artifacts",
            Component::Forecast => "forecast",
            Component::Predictor => "predictor",
        };
        f.write_str(name)
    }
}

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing, but the agent can still answer some requests
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            updated_at: Utc::now(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    model_id: Option<String>,
}

/// Shared, cloneable view of the agent's component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// All components start healthy except the artifacts, which stay
    /// unhealthy until a model is loaded
    pub fn new() -> Self {
        let components = Component::ALL
            .into_iter()
            .map(|c| {
                let health = match c {
                    Component::Artifacts => {
                        ComponentHealth::new(ComponentStatus::Unhealthy, Some("not loaded".to_string()))
                    }
                    _ => ComponentHealth::new(ComponentStatus::Healthy, None),
                };
                (c, health)
            })
            .collect();
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                components,
                model_id: None,
            })),
        }
    }

    async fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        state.components.insert(component, ComponentHealth::new(status, message));
    }

    /// Record a successfully loaded artifact triple
    pub async fn model_loaded(&self, model_id: impl Into<String>) {
        let mut state = self.state.write().await;
        state.model_id = Some(model_id.into());
        state
            .components
            .insert(Component::Artifacts, ComponentHealth::new(ComponentStatus::Healthy, None));
    }

    /// Record that the artifact triple could not be loaded
    pub async fn artifacts_unavailable(&self, reason: impl Into<String>) {
        let mut state = self.state.write().await;
        state.model_id = None;
        state.components.insert(
            Component::Artifacts,
            ComponentHealth::new(ComponentStatus::Unhealthy, Some(reason.into())),
        );
    }

    /// Update health from the outcome of one prediction.
    ///
    /// Success clears the predictor, and the forecast provider too when the
    /// prediction went through it. A failure degrades whichever component
    /// it is charged to.
    pub async fn record_prediction<T>(&self, outcome: &Result<T>, used_forecast: bool) {
        match outcome {
            Ok(_) => {
                self.set(Component::Predictor, ComponentStatus::Healthy, None).await;
                if used_forecast {
                    self.set(Component::Forecast, ComponentStatus::Healthy, None).await;
                }
            }
            Err(e) => {
                if let Some(component) = Component::charged_for(e) {
                    let message = match e {
                        PredictorError::Forecast(reason) => reason.clone(),
                        other => other.to_string(),
                    };
                    self.set(component, ComponentStatus::Degraded, Some(message)).await;
                }
            }
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse {
            status,
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let health = self.health().await;
        let model_id = self.state.read().await.model_id.clone();

        let reason = if model_id.is_none() {
            Some("Model artifacts not loaded".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            let failing: Vec<String> = health
                .components
                .iter()
                .filter(|(_, h)| h.status == ComponentStatus::Unhealthy)
                .map(|(c, _)| c.to_string())
                .collect();
            Some(format!("Unhealthy: {}", failing.join(", ")))
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            model_id,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_registry_waits_for_artifacts() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(health.components.len(), 3);
        assert_eq!(health.components[&Component::Forecast].status, ComponentStatus::Healthy);

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Model artifacts not loaded"));
    }

    #[tokio::test]
    async fn test_model_loaded_is_ready() {
        let registry = HealthRegistry::new();
        registry.model_loaded("abcdef012345").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert_eq!(readiness.model_id.as_deref(), Some("abcdef012345"));
    }

    #[tokio::test]
    async fn test_forecast_outage_degrades_but_stays_ready() {
        let registry = HealthRegistry::new();
        registry.model_loaded("abcdef012345").await;

        let outcome: Result<()> = Err(PredictorError::Forecast("api.weather.gov returned 503".to_string()));
        registry.record_prediction(&outcome, true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[&Component::Forecast].message.as_deref(),
            Some("api.weather.gov returned 503")
        );
        assert!(registry.readiness().await.ready);

        registry.record_prediction(&Ok(()), true).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_caller_errors_leave_health_alone() {
        let registry = HealthRegistry::new();
        registry.model_loaded("abcdef012345").await;

        let outcome: Result<()> = Err(PredictorError::SiteNotFound {
            site: "Baikonur".to_string(),
        });
        registry.record_prediction(&outcome, true).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_inference_failure_degrades_predictor() {
        let registry = HealthRegistry::new();
        registry.model_loaded("abcdef012345").await;

        let outcome: Result<()> = Err(PredictorError::SchemaMismatch {
            component: "scaler",
            expected: 9,
            actual: 10,
        });
        registry.record_prediction(&outcome, false).await;

        let health = registry.health().await;
        assert_eq!(health.components[&Component::Predictor].status, ComponentStatus::Degraded);
        assert_eq!(health.components[&Component::Forecast].status, ComponentStatus::Healthy);

        registry.record_prediction(&Ok(()), false).await;
        assert_eq!(health_status(&registry, Component::Predictor).await, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_artifacts_unavailable_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.model_loaded("abcdef012345").await;
        registry.artifacts_unavailable("launch_model.json not found").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.model_id.is_none());
    }

    #[test]
    fn test_components_serialize_by_name() {
        let json = serde_json::to_value(Component::Predictor).unwrap();
        assert_eq!(json, "predictor");
        assert_eq!(Component::Forecast.to_string(), "forecast");
    }

    async fn health_status(registry: &HealthRegistry, component: Component) -> ComponentStatus {
        registry.health().await.components[&component].status
    }
}
