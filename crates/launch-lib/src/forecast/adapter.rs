//! Conversion of a forecast period into a raw feature mapping
//!
//! The forecast payload has no humidity or visibility readings, so those two
//! columns come from an explicit imputation strategy.

use crate::error::{PredictorError, Result};
use crate::models::{
    site_column, ForecastPeriod, CLOUD_COVER_PCT, HUMIDITY_PCT, RAIN_FLAG, TEMPERATURE_C, THUNDERSTORM_FLAG,
    VISIBILITY_KM, WIND_SPEED_KMH,
};
use crate::predictor::Artifacts;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Unordered, possibly incomplete feature mapping
pub type RawForecastFeatures = HashMap<String, f64>;

/// Miles per hour to kilometres per hour
pub const MPH_TO_KMH: f64 = 1.609;

/// How to fill features the forecast cannot observe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Fixed values for every prediction
    Constant { humidity: f64, visibility: f64 },
    /// Training-partition column means recovered from the fitted scaler
    TrainingMean,
    /// Uniform draws in humidity 50..90 and visibility 5..10 from a seeded RNG
    SeededRandom { seed: u64 },
}

impl Default for ImputationStrategy {
    fn default() -> Self {
        Self::TrainingMean
    }
}

impl fmt::Display for ImputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { humidity, visibility } => {
                write!(f, "constant(humidity={}, visibility={})", humidity, visibility)
            }
            Self::TrainingMean => write!(f, "training_mean"),
            Self::SeededRandom { seed } => write!(f, "seeded_random({})", seed),
        }
    }
}

/// Builds `RawForecastFeatures` from forecast periods
#[derive(Debug, Clone)]
pub struct ForecastAdapter {
    strategy: ImputationStrategy,
    training_means: HashMap<String, f64>,
}

impl ForecastAdapter {
    pub fn new(strategy: ImputationStrategy) -> Self {
        Self {
            strategy,
            training_means: HashMap::new(),
        }
    }

    /// Adapter whose `TrainingMean` strategy reads the artifacts' scaler means
    pub fn for_artifacts(strategy: ImputationStrategy, artifacts: &Artifacts) -> Self {
        Self {
            strategy,
            training_means: artifacts.training_means(),
        }
    }

    pub fn strategy(&self) -> &ImputationStrategy {
        &self.strategy
    }

    pub fn adapt(&self, period: &ForecastPeriod, site: &str) -> Result<RawForecastFeatures> {
        let description = period.short_forecast.to_lowercase();

        let wind_mph = leading_integer(&period.wind_speed).ok_or_else(|| PredictorError::ForecastUnavailable {
            site: site.to_string(),
            date: period.start_time.clone(),
            reason: format!("no wind speed in '{}'", period.wind_speed),
        })?;

        let cloud_cover = if description.contains("cloudy") {
            100.0
        } else if description.contains("partly") {
            50.0
        } else {
            0.0
        };

        let (humidity, visibility) = self.impute();

        let mut features = RawForecastFeatures::new();
        features.insert(
            TEMPERATURE_C.to_string(),
            to_celsius(period.temperature, &period.temperature_unit),
        );
        features.insert(HUMIDITY_PCT.to_string(), humidity);
        features.insert(WIND_SPEED_KMH.to_string(), wind_mph * MPH_TO_KMH);
        features.insert(CLOUD_COVER_PCT.to_string(), cloud_cover);
        features.insert(VISIBILITY_KM.to_string(), visibility);
        features.insert(RAIN_FLAG.to_string(), flag(description.contains("rain")));
        features.insert(THUNDERSTORM_FLAG.to_string(), flag(description.contains("thunder")));
        features.insert(site_column(site), 1.0);

        debug!(site = %site, start_time = %period.start_time, strategy = %self.strategy, "Adapted forecast period");
        Ok(features)
    }

    fn impute(&self) -> (f64, f64) {
        match &self.strategy {
            ImputationStrategy::Constant { humidity, visibility } => (*humidity, *visibility),
            ImputationStrategy::TrainingMean => {
                let mean = |name: &str| self.training_means.get(name).copied().unwrap_or(0.0);
                (mean(HUMIDITY_PCT), mean(VISIBILITY_KM))
            }
            ImputationStrategy::SeededRandom { seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (rng.gen_range(50..90) as f64, rng.gen_range(5..10) as f64)
            }
        }
    }
}

fn flag(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}

/// Temperature in Celsius; only "F" is converted
pub fn to_celsius(value: f64, unit: &str) -> f64 {
    if unit.eq_ignore_ascii_case("F") {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    }
}

/// First run of ASCII digits in `text`, e.g. 10 for "10 to 15 mph"
fn leading_integer(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<f64>().ok()
}
