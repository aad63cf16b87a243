//! Model training command

use anyhow::{Context, Result};
use clap::Args;
use launch_lib::artifacts::SavedArtifacts;
use launch_lib::predictor::{
    Evaluation, ForestParams, ParamGrid, TrainerConfig, DEFAULT_CV_FOLDS, DEFAULT_SEED, DEFAULT_TEST_FRACTION,
};
use launch_lib::{train, ArtifactStore, HistoricalDataset, StructuredLogger};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabled::Tabled;

use super::evaluate::print_evaluation;
use crate::output::{format_score, print_info, print_json, print_success, print_table, OutputFormat};

/// Depth limit for the search grid; `none` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLimit(pub Option<usize>);

impl FromStr for DepthLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self(None));
        }
        s.parse::<usize>()
            .map(|d| Self(Some(d)))
            .map_err(|_| format!("'{}' is not a depth (use a number or 'none')", s))
    }
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Historical CSV with DateTime, LaunchSite, measurements and SuitableForLaunch
    pub data: PathBuf,

    /// Tree counts to search
    #[arg(long, value_delimiter = ',', default_values = ["100", "200"])]
    pub trees: Vec<usize>,

    /// Maximum depths to search ("none" for unbounded)
    #[arg(long, value_delimiter = ',', default_values = ["none", "10", "20"])]
    pub max_depth: Vec<DepthLimit>,

    /// Minimum samples per split to search
    #[arg(long, value_delimiter = ',', default_values = ["2", "5"])]
    pub min_split: Vec<usize>,

    /// Cross-validation folds
    #[arg(long, default_value_t = DEFAULT_CV_FOLDS)]
    pub folds: usize,

    /// Held-out test fraction
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// Seed for the split and the forests
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Score grid candidates one at a time
    #[arg(long)]
    pub sequential: bool,
}

impl TrainArgs {
    fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            test_fraction: self.test_fraction,
            cv_folds: self.folds,
            seed: self.seed,
            grid: ParamGrid {
                n_trees: self.trees.clone(),
                max_depth: self.max_depth.iter().map(|d| d.0).collect(),
                min_samples_split: self.min_split.clone(),
            },
            parallel: !self.sequential,
        }
    }
}

/// Row for the grid search table
#[derive(Tabled, Serialize)]
struct CandidateRow {
    #[tabled(rename = "Trees")]
    trees: usize,
    #[tabled(rename = "Max depth")]
    max_depth: String,
    #[tabled(rename = "Min split")]
    min_split: usize,
    #[tabled(rename = "CV accuracy")]
    score: String,
    #[tabled(rename = "Best")]
    best: String,
}

#[derive(Serialize)]
struct TrainReport<'a> {
    model_id: String,
    best_params: ForestParams,
    cv_accuracy: f64,
    train_rows: usize,
    test_rows: usize,
    features: &'a [String],
    evaluation: &'a Evaluation,
    artifacts: &'a SavedArtifacts,
}

pub fn run(args: &TrainArgs, artifact_dir: &Path, format: OutputFormat) -> Result<()> {
    let dataset = HistoricalDataset::from_path(&args.data)
        .with_context(|| format!("Failed to load dataset {}", args.data.display()))?;

    if format == OutputFormat::Table {
        let (not_suitable, suitable) = dataset.class_counts();
        print_info(&format!(
            "Loaded {} rows ({} suitable, {} not suitable) across {} sites",
            dataset.len(),
            suitable,
            not_suitable,
            dataset.sites().len()
        ));
    }

    let store = ArtifactStore::new(artifact_dir);
    let (outcome, saved) = train(&dataset, args.trainer_config(), &store).context("Training failed")?;

    let logger = StructuredLogger::new("lcast");
    logger.log_training_completed(&outcome);
    logger.log_artifacts_saved(&saved);

    if format == OutputFormat::Json {
        print_json(&TrainReport {
            model_id: saved.model_id(),
            best_params: outcome.search.best_params,
            cv_accuracy: outcome.search.best_score,
            train_rows: outcome.train_rows,
            test_rows: outcome.test_rows,
            features: outcome.schema.names(),
            evaluation: &outcome.evaluation,
            artifacts: &saved,
        });
        return Ok(());
    }

    let rows: Vec<CandidateRow> = outcome
        .search
        .candidates
        .iter()
        .map(|c| CandidateRow {
            trees: c.params.n_trees,
            max_depth: c.params.max_depth.map_or("none".to_string(), |d| d.to_string()),
            min_split: c.params.min_samples_split,
            score: format_score(c.mean_score),
            best: if c.params == outcome.search.best_params { "*".to_string() } else { String::new() },
        })
        .collect();
    print_table(&rows, format);

    print_info(&format!(
        "Best: {} (CV accuracy {}), {} train / {} test rows",
        outcome.search.best_params,
        format_score(outcome.search.best_score),
        outcome.train_rows,
        outcome.test_rows
    ));
    print_evaluation(&outcome.evaluation, format);
    print_success(&format!(
        "Saved model {} to {}",
        saved.model_id(),
        store.dir().display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_limit_parsing() {
        assert_eq!("none".parse::<DepthLimit>().unwrap(), DepthLimit(None));
        assert_eq!("12".parse::<DepthLimit>().unwrap(), DepthLimit(Some(12)));
        assert!("deep".parse::<DepthLimit>().is_err());
    }
}
