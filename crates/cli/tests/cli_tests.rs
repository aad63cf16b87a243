//! CLI integration tests

use std::fmt::Write as _;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI with HOME pointed at `home` so no user config is picked up
fn lcast(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lcast"))
        .args(args)
        .env("HOME", home)
        .env_remove("LAUNCHCAST_ARTIFACT_DIR")
        .env_remove("LAUNCHCAST_FORECAST_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Write a small historical CSV where launches are suitable in calm wind
fn write_dataset(path: &Path, rows: usize) {
    let sites = ["Cape Canaveral", "Kennedy LC-39A", "VAFB SLC 4E"];
    let mut csv = String::from(
        "DateTime,LaunchSite,Temperature (°C),Humidity (%),Wind Speed (km/h),Cloud Cover (%),\
         Visibility (km),Rain?,Thunderstorm?,SuitableForLaunch\n",
    );
    for i in 0..rows {
        let wind = i * 11 % 60;
        writeln!(
            csv,
            "2024-02-{:02} 12:00:00,{},{},{},{},{},{},False,False,{}",
            i % 28 + 1,
            sites[i % 3],
            15 + i % 12,
            60 + i % 30,
            wind,
            i * 3 % 100,
            6 + i % 4,
            u8::from(wind < 30)
        )
        .unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Launch-weather suitability predictor"), "Should show about text");
    for command in ["train", "predict", "sites", "schema", "evaluate"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout(&output).contains("lcast"), "Should show binary name");
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["train", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--trees"), "Should show trees option");
    assert!(stdout.contains("--max-depth"), "Should show max-depth option");
    assert!(stdout.contains("--folds"), "Should show folds option");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["predict", "--help"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--imputation"), "Should show imputation option");
    assert!(stdout.contains("training-mean"), "Should list imputation strategies");
}

/// Test sites listing as JSON
#[test]
fn test_sites_json() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["sites", "--format", "json"]);

    assert!(output.status.success(), "Sites should succeed");
    let sites: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(sites.as_array().unwrap().len(), 3);
    assert_eq!(sites[0]["name"], "Cape Canaveral");
}

/// Test that configured sites are listed alongside the built-in ones
#[test]
fn test_sites_from_config_file() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("launchcast");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        r#"{"sites": [{"name": "Boca Chica", "latitude": 25.997, "longitude": -97.157}]}"#,
    )
    .unwrap();

    let output = lcast(home.path(), &["sites", "--format", "json"]);
    let sites: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(sites.as_array().unwrap().len(), 4);
    assert_eq!(sites[0]["name"], "Boca Chica");
}

/// Test train, schema and evaluate against one artifact directory
#[test]
fn test_train_schema_evaluate() {
    let home = TempDir::new().unwrap();
    let data = home.path().join("history.csv");
    let artifacts = home.path().join("artifacts");
    write_dataset(&data, 90);
    let artifacts_arg = artifacts.to_str().unwrap();
    let data_arg = data.to_str().unwrap();

    let output = lcast(
        home.path(),
        &[
            "train",
            data_arg,
            "--trees",
            "10",
            "--max-depth",
            "none,4",
            "--min-split",
            "2",
            "--artifacts",
            artifacts_arg,
            "--format",
            "json",
        ],
    );
    assert!(
        output.status.success(),
        "Train should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("Training complete"),
        "info-level progress should be logged without --verbose"
    );
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["model_id"].as_str().unwrap().len(), 12);
    assert_eq!(report["test_rows"], 18);
    assert_eq!(report["features"].as_array().unwrap().len(), 10);
    assert!(artifacts.join("launch_model.json").is_file());
    assert!(artifacts.join("weather_scaler.json").is_file());
    assert!(artifacts.join("feature_names.json").is_file());

    let output = lcast(home.path(), &["schema", "--artifacts", artifacts_arg, "--format", "json"]);
    assert!(output.status.success(), "Schema should succeed");
    let schema: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(schema[9]["name"], "LaunchSite_VAFB SLC 4E");

    let output = lcast(
        home.path(),
        &["evaluate", data_arg, "--artifacts", artifacts_arg, "--format", "json"],
    );
    assert!(output.status.success(), "Evaluate should succeed");
    let evaluation: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(evaluation["accuracy"].as_f64().unwrap() > 0.8);
}

/// Test that a fold count below two is an error rather than a crash
#[test]
fn test_train_rejects_zero_folds() {
    let home = TempDir::new().unwrap();
    let data = home.path().join("history.csv");
    write_dataset(&data, 30);
    let artifacts = home.path().join("artifacts");

    let output = lcast(
        home.path(),
        &[
            "train",
            data.to_str().unwrap(),
            "--folds",
            "0",
            "--artifacts",
            artifacts.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least 2 folds"), "unexpected stderr: {stderr}");
    assert!(!stderr.contains("panicked"));
    assert!(!artifacts.join("launch_model.json").exists());
}

/// Test that a schema file from a different run is reported, not indexed past
#[test]
fn test_schema_rejects_mismatched_artifacts() {
    let home = TempDir::new().unwrap();
    let data = home.path().join("history.csv");
    let artifacts = home.path().join("artifacts");
    write_dataset(&data, 60);
    let artifacts_arg = artifacts.to_str().unwrap();

    let output = lcast(
        home.path(),
        &[
            "train",
            data.to_str().unwrap(),
            "--trees",
            "5",
            "--max-depth",
            "none",
            "--min-split",
            "2",
            "--artifacts",
            artifacts_arg,
        ],
    );
    assert!(output.status.success(), "Train should succeed");
    std::fs::write(
        artifacts.join("feature_names.json"),
        r#"["Temperature (°C)","Wind Speed (km/h)","LaunchSite_Cape Canaveral"]"#,
    )
    .unwrap();

    let output = lcast(home.path(), &["schema", "--artifacts", artifacts_arg]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("schema mismatch"), "unexpected stderr: {stderr}");
    assert!(!stderr.contains("panicked"));
}

/// Test that predicting without artifacts fails cleanly
#[test]
fn test_predict_without_artifacts_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("missing");
    let output = lcast(
        home.path(),
        &["predict", "Cape Canaveral", "2025-03-01", "--artifacts", missing.to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load artifacts"));
}

/// Test that an unknown site is rejected before any network access
#[test]
fn test_predict_unknown_site_fails() {
    let home = TempDir::new().unwrap();
    let output = lcast(home.path(), &["predict", "Baikonur", "2025-03-01"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown launch site"));
}
