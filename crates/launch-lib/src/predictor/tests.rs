//! Pipeline tests across schema, scaler, forest and artifact store
//!
//! These train small forests on generated CSV data and check the properties
//! that must hold between training time and serving time.

#[cfg(test)]
mod pipeline_tests {
    use crate::artifacts::ArtifactStore;
    use crate::dataset::HistoricalDataset;
    use crate::error::PredictorError;
    use crate::forecast::{ForecastAdapter, ImputationStrategy};
    use crate::models::{ForecastPeriod, HUMIDITY_PCT, TEMPERATURE_C, VISIBILITY_KM, WIND_SPEED_KMH};
    use crate::predictor::{
        Artifacts, FeatureSchema, InferencePipeline, ParamGrid, StandardScaler, Trainer, TrainerConfig,
    };
    use std::collections::HashMap;
    use std::fmt::Write;
    use tempfile::TempDir;

    /// Helper producing a CSV in the historical record layout
    fn historical_csv(rows: usize) -> String {
        let sites = ["Cape Canaveral", "Kennedy LC-39A", "VAFB SLC 4E"];
        let mut csv = String::from(
            "DateTime,LaunchSite,Temperature (°C),Humidity (%),Wind Speed (km/h),Cloud Cover (%),\
             Visibility (km),Rain?,Thunderstorm?,SuitableForLaunch\n",
        );
        for i in 0..rows {
            let wind = (i * 13 % 70) as f64;
            let rain = i % 7 == 0;
            let thunder = i % 13 == 0;
            let suitable = wind < 35.0 && !thunder;
            writeln!(
                csv,
                "2024-01-{:02} {:02}:00:00,{},{},{},{},{},{},{},{},{}",
                i % 28 + 1,
                i % 24,
                sites[i % 3],
                18.0 + (i % 9) as f64,
                55 + i % 35,
                wind,
                (i * 17 % 100),
                5 + i % 5,
                if rain { "True" } else { "False" },
                if thunder { "True" } else { "False" },
                u8::from(suitable)
            )
            .unwrap();
        }
        csv
    }

    fn quick_trainer() -> Trainer {
        Trainer::new(TrainerConfig {
            grid: ParamGrid {
                n_trees: vec![20],
                max_depth: vec![None, Some(6)],
                min_samples_split: vec![2],
            },
            ..Default::default()
        })
    }

    fn trained() -> Artifacts {
        let dataset = HistoricalDataset::from_reader(historical_csv(150).as_bytes()).unwrap();
        quick_trainer().fit(&dataset).unwrap().into_artifacts()
    }

    fn raw(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_schema_from_csv_layout() {
        let artifacts = trained();
        let names = artifacts.schema.names();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], TEMPERATURE_C);
        assert_eq!(names[6], "Thunderstorm?");
        assert_eq!(
            &names[7..],
            &["LaunchSite_Cape Canaveral", "LaunchSite_Kennedy LC-39A", "LaunchSite_VAFB SLC 4E"]
        );
        assert!(artifacts.check_consistency().is_ok());
    }

    #[test]
    fn test_labels_are_binary_for_arbitrary_inputs() {
        let artifacts = trained();
        let pipeline = InferencePipeline::new();
        for wind in [0.0, 20.0, 40.0, 200.0, -5.0] {
            let p = pipeline
                .predict(&raw(&[(WIND_SPEED_KMH, wind), ("unrelated", 1e9)]), &artifacts)
                .unwrap();
            assert!(p.label <= 1);
            assert!((p.probabilities[0] + p.probabilities[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_width_mismatch_is_schema_mismatch() {
        let mut artifacts = trained();
        let mut names = artifacts.schema.names().to_vec();
        names.push("LaunchSite_Boca Chica".to_string());
        artifacts.schema = FeatureSchema::new(names);

        let err = InferencePipeline::new().predict(&raw(&[]), &artifacts).unwrap_err();
        match err {
            PredictorError::SchemaMismatch {
                component,
                expected,
                actual,
            } => {
                assert_eq!(component, "scaler");
                assert_eq!(expected, 10);
                assert_eq!(actual, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scaler_from_other_run_is_rejected() {
        let mut artifacts = trained();
        artifacts.scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let err = InferencePipeline::new().predict(&raw(&[]), &artifacts).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaMismatch { component: "scaler", .. }));
    }

    #[test]
    fn test_unknown_site_not_in_schema() {
        let artifacts = trained();
        let err = InferencePipeline::new()
            .predict_for_site("Boca Chica", &raw(&[("LaunchSite_Boca Chica", 1.0)]), &artifacts)
            .unwrap_err();
        match err {
            PredictorError::SiteNotInSchema { column, .. } => assert_eq!(column, "LaunchSite_Boca Chica"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_site_indicator_without_site_name() {
        let artifacts = trained();
        let pipeline = InferencePipeline::new();

        let err = pipeline
            .predict(&raw(&[("LaunchSite_Boca Chica", 1.0), (WIND_SPEED_KMH, 5.0)]), &artifacts)
            .unwrap_err();
        match err {
            PredictorError::SiteNotInSchema { site, column } => {
                assert_eq!(site, "Boca Chica");
                assert_eq!(column, "LaunchSite_Boca Chica");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Unknown non-site names are still ignored
        let prediction = pipeline
            .predict(&raw(&[("Dew Point", 3.0), ("LaunchSite_Cape Canaveral", 1.0)]), &artifacts)
            .unwrap();
        assert!(prediction.label <= 1);
    }

    #[test]
    fn test_train_save_load_predict_matches_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let artifacts = trained();
        store.save_artifacts(&artifacts).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, artifacts);

        let adapter = ForecastAdapter::for_artifacts(ImputationStrategy::TrainingMean, &loaded);
        let period = ForecastPeriod {
            start_time: "2025-03-01T06:00:00-05:00".to_string(),
            temperature: 72.0,
            temperature_unit: "F".to_string(),
            wind_speed: "8 to 12 mph".to_string(),
            short_forecast: "Partly Sunny".to_string(),
        };
        let features = adapter.adapt(&period, "Kennedy LC-39A").unwrap();

        let pipeline = InferencePipeline::new();
        let from_disk = pipeline.predict_for_site("Kennedy LC-39A", &features, &loaded).unwrap();
        let in_memory = pipeline.predict_for_site("Kennedy LC-39A", &features, &artifacts).unwrap();
        assert_eq!(from_disk, in_memory);
    }

    #[test]
    fn test_training_mean_imputation_uses_scaler_means() {
        let artifacts = trained();
        let means = artifacts.training_means();
        let adapter = ForecastAdapter::for_artifacts(ImputationStrategy::TrainingMean, &artifacts);
        let period = ForecastPeriod {
            start_time: "2025-03-01T06:00:00-05:00".to_string(),
            temperature: 20.0,
            temperature_unit: "C".to_string(),
            wind_speed: "5 mph".to_string(),
            short_forecast: "Clear".to_string(),
        };
        let features = adapter.adapt(&period, "Cape Canaveral").unwrap();

        assert_eq!(features[HUMIDITY_PCT], means[HUMIDITY_PCT]);
        assert_eq!(features[VISIBILITY_KM], means[VISIBILITY_KM]);
        assert!(features[HUMIDITY_PCT] >= 55.0 && features[HUMIDITY_PCT] < 90.0);
    }

    #[test]
    fn test_importances_ranked() {
        let ranked = trained().ranked_importances();
        assert_eq!(ranked.len(), 10);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        let total: f64 = ranked.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }
}
