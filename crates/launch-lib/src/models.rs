//! Core data models for launch-weather prediction

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp column, parsed then dropped before encoding
pub const DATETIME_COLUMN: &str = "DateTime";
/// Categorical site column, one-hot encoded as `LaunchSite_<site>`
pub const SITE_COLUMN: &str = "LaunchSite";
/// Binary training label
pub const LABEL_COLUMN: &str = "SuitableForLaunch";
/// Prefix of the one-hot site indicator columns
pub const SITE_PREFIX: &str = "LaunchSite_";

pub const TEMPERATURE_C: &str = "Temperature (°C)";
pub const HUMIDITY_PCT: &str = "Humidity (%)";
pub const WIND_SPEED_KMH: &str = "Wind Speed (km/h)";
pub const CLOUD_COVER_PCT: &str = "Cloud Cover (%)";
pub const VISIBILITY_KM: &str = "Visibility (km)";
pub const RAIN_FLAG: &str = "Rain?";
pub const THUNDERSTORM_FLAG: &str = "Thunderstorm?";

/// Name of the indicator column for a launch site
pub fn site_column(site: &str) -> String {
    format!("{}{}", SITE_PREFIX, site)
}

/// One row of historical training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub launch_site: String,
    /// Numeric measurements in the dataset's column order
    pub measurements: Vec<f64>,
    pub suitable_for_launch: u8,
}

/// Launch-suitability prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = suitable, 0 = not suitable
    pub label: u8,
    /// [P(not suitable), P(suitable)]
    pub probabilities: [f64; 2],
}

impl Prediction {
    pub fn is_suitable(&self) -> bool {
        self.label == 1
    }

    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.label as usize]
    }
}

/// Geographic coordinates of a launch site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One time-bounded period of a live forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub start_time: String,
    pub temperature: f64,
    pub temperature_unit: String,
    pub wind_speed: String,
    pub short_forecast: String,
}

/// Prediction for a site and date together with the observed inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchAssessment {
    pub site: String,
    pub date: String,
    pub period: ForecastPeriod,
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub cloud_cover_pct: f64,
    pub rain: bool,
    pub thunderstorm: bool,
    pub prediction: Prediction,
}
