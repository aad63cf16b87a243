//! Evaluation of saved artifacts and evaluation report printing

use anyhow::{Context, Result};
use launch_lib::predictor::Evaluation;
use launch_lib::{evaluate_dataset, ArtifactStore, HistoricalDataset};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_score, print_info, print_json, print_table, OutputFormat};

/// Row for the per-class report table
#[derive(Tabled, Serialize)]
struct ClassRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1: String,
    #[tabled(rename = "Support")]
    support: usize,
}

/// Row for the confusion matrix table
#[derive(Tabled, Serialize)]
struct ConfusionRow {
    #[tabled(rename = "Actual \\ Predicted")]
    actual: &'static str,
    #[tabled(rename = "Not suitable")]
    predicted_0: usize,
    #[tabled(rename = "Suitable")]
    predicted_1: usize,
}

fn class_name(class: u8) -> &'static str {
    if class == 1 {
        "Suitable"
    } else {
        "Not suitable"
    }
}

/// Print accuracy, AUC, the class report and the confusion matrix
pub fn print_evaluation(evaluation: &Evaluation, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(evaluation);
        return;
    }

    print_info(&format!(
        "Accuracy {}  AUC {}",
        format_score(evaluation.accuracy),
        format_score(evaluation.auc)
    ));

    let classes: Vec<ClassRow> = evaluation
        .classes
        .iter()
        .map(|report| ClassRow {
            class: class_name(report.class).to_string(),
            precision: format_score(report.precision),
            recall: format_score(report.recall),
            f1: format_score(report.f1),
            support: report.support,
        })
        .collect();
    print_table(&classes, format);

    let counts = evaluation.confusion.counts;
    let confusion: Vec<ConfusionRow> = (0..2)
        .map(|actual| ConfusionRow {
            actual: class_name(actual as u8),
            predicted_0: counts[actual][0],
            predicted_1: counts[actual][1],
        })
        .collect();
    print_table(&confusion, format);
}

/// Evaluate the saved model against a labelled CSV
pub fn run(data: &Path, artifact_dir: &Path, format: OutputFormat) -> Result<()> {
    let dataset = HistoricalDataset::from_path(data)
        .with_context(|| format!("Failed to load dataset {}", data.display()))?;
    let artifacts = ArtifactStore::new(artifact_dir)
        .load()
        .with_context(|| format!("Failed to load artifacts from {}", artifact_dir.display()))?;

    let evaluation = evaluate_dataset(&dataset, &artifacts).context("Evaluation failed")?;

    if format == OutputFormat::Table {
        print_info(&format!("Evaluated {} rows from {}", dataset.len(), data.display()));
    }
    print_evaluation(&evaluation, format);
    Ok(())
}
