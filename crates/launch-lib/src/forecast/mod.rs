//! Live forecast retrieval and conversion into raw model features

mod adapter;
mod nws;

pub use adapter::{ForecastAdapter, ImputationStrategy, RawForecastFeatures, MPH_TO_KMH};
pub use nws::{NwsClient, NwsConfig, DEFAULT_NWS_URL};

use crate::error::Result;
use crate::models::{Coordinates, ForecastPeriod};
use async_trait::async_trait;

/// Source of time-bounded forecast periods for a location
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn periods(&self, coordinates: Coordinates) -> Result<Vec<ForecastPeriod>>;
}

/// First period whose start time contains the requested date string
pub fn select_period<'a>(periods: &'a [ForecastPeriod], date: &str) -> Option<&'a ForecastPeriod> {
    periods.iter().find(|p| p.start_time.contains(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(start: &str, desc: &str) -> ForecastPeriod {
        ForecastPeriod {
            start_time: start.to_string(),
            temperature: 70.0,
            temperature_unit: "F".to_string(),
            wind_speed: "5 mph".to_string(),
            short_forecast: desc.to_string(),
        }
    }

    #[test]
    fn test_select_first_matching_period() {
        let periods = vec![
            period("2025-03-01T06:00:00-05:00", "Sunny"),
            period("2025-03-02T06:00:00-05:00", "Rain"),
            period("2025-03-02T18:00:00-05:00", "Clear"),
        ];
        assert_eq!(select_period(&periods, "2025-03-02").unwrap().short_forecast, "Rain");
        assert!(select_period(&periods, "2025-04-01").is_none());
    }
}
