//! Feature schema of the saved model

use anyhow::{Context, Result};
use launch_lib::ArtifactStore;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_score, print_info, print_table, OutputFormat};

/// Row for schema table
#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

pub fn show_schema(artifact_dir: &Path, format: OutputFormat) -> Result<()> {
    let store = ArtifactStore::new(artifact_dir);
    let artifacts = store
        .load()
        .with_context(|| format!("Failed to load artifacts from {}", artifact_dir.display()))?;
    let saved = store.checksums()?;

    let importances = artifacts.classifier.feature_importances();
    let rows: Vec<FeatureRow> = artifacts
        .schema
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| FeatureRow {
            position: i,
            name: name.clone(),
            mean: format!("{:.3}", artifacts.scaler.mean()[i]),
            importance: format_score(importances[i]),
        })
        .collect();

    if format == OutputFormat::Table {
        print_info(&format!(
            "Model {}: {} features, {} trees ({})",
            saved.model_id(),
            artifacts.schema.len(),
            artifacts.classifier.trees().len(),
            artifacts.classifier.params()
        ));
    }
    print_table(&rows, format);
    Ok(())
}
