//! Model training: split, scale, grid search, refit, evaluate
//!
//! The encoded dataset is shuffled once with a fixed seed and split 80/20.
//! The scaler is fitted on the training partition only. Each grid candidate
//! is scored by mean accuracy over stratified k folds of the scaled training
//! partition; the winner is refitted on the whole partition and evaluated on
//! the held-out rows.

use super::evaluation::Evaluation;
use super::forest::{ForestParams, RandomForest, DEFAULT_SEED};
use super::inference::Artifacts;
use super::scaler::StandardScaler;
use super::schema::FeatureSchema;
use super::Classifier;
use crate::dataset::HistoricalDataset;
use crate::error::{PredictorError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Default held-out fraction
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default number of cross-validation folds
pub const DEFAULT_CV_FOLDS: usize = 3;

/// Hyperparameter grid for the forest search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_trees: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![100, 200],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5],
        }
    }
}

impl ParamGrid {
    /// All combinations in search order: tree count outermost, then depth,
    /// then minimum split size. Ties in score go to the earliest candidate.
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut out = Vec::with_capacity(self.n_trees.len() * self.max_depth.len() * self.min_samples_split.len());
        for &n_trees in &self.n_trees {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    out.push(ForestParams {
                        n_trees,
                        max_depth,
                        min_samples_split,
                    });
                }
            }
        }
        out
    }
}

/// Configuration for a training run
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
    /// Seed for the split and for every forest fitted during the run
    pub seed: u64,
    pub grid: ParamGrid,
    /// Score grid candidates on the rayon pool
    pub parallel: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            cv_folds: DEFAULT_CV_FOLDS,
            seed: DEFAULT_SEED,
            grid: ParamGrid::default(),
            parallel: true,
        }
    }
}

/// Cross-validated score of one grid candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Outcome of the hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best_params: ForestParams,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
    pub schema: FeatureSchema,
    pub evaluation: Evaluation,
    pub search: SearchResult,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingOutcome {
    pub fn artifacts(&self) -> Artifacts {
        Artifacts::new(self.scaler.clone(), self.classifier.clone(), self.schema.clone())
    }

    pub fn into_artifacts(self) -> Artifacts {
        Artifacts::new(self.scaler, self.classifier, self.schema)
    }
}

/// Fits scaler + classifier + schema from historical data
pub struct Trainer {
    config: TrainerConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn fit(&self, dataset: &HistoricalDataset) -> Result<TrainingOutcome> {
        let start = Instant::now();
        if self.config.cv_folds < 2 {
            return Err(PredictorError::insufficient(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.config.cv_folds
            )));
        }
        let schema = FeatureSchema::derive(dataset)?;

        let rows: Vec<Vec<f64>> = dataset
            .records()
            .iter()
            .map(|r| schema.encode(&r.measurements, &r.launch_site))
            .collect();
        let labels: Vec<u8> = dataset.records().iter().map(|r| r.suitable_for_launch).collect();

        let (train_idx, test_idx) = self.split(rows.len())?;
        let pick_rows = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<_>>();
        let pick_labels = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect::<Vec<_>>();
        let (x_train, y_train) = (pick_rows(&train_idx), pick_labels(&train_idx));
        let (x_test, y_test) = (pick_rows(&test_idx), pick_labels(&test_idx));

        for class in 0..=1u8 {
            if !y_train.contains(&class) {
                return Err(PredictorError::insufficient(format!(
                    "class {} is absent from the training partition ({} rows)",
                    class,
                    y_train.len()
                )));
            }
        }
        if x_train.len() < self.config.cv_folds {
            return Err(PredictorError::insufficient(format!(
                "{} training rows cannot be split into {} folds",
                x_train.len(),
                self.config.cv_folds
            )));
        }

        let scaler = StandardScaler::fit(&x_train)?;
        let x_train = scaler.transform_all(&x_train)?;
        let x_test = scaler.transform_all(&x_test)?;

        let search = self.grid_search(&x_train, &y_train)?;
        info!(
            best = %search.best_params,
            cv_accuracy = search.best_score,
            candidates = search.candidates.len(),
            "Hyperparameter search complete"
        );

        let classifier = RandomForest::fit(&x_train, &y_train, search.best_params, self.config.seed)?;
        let evaluation = evaluate(&classifier, &x_test, &y_test)?;

        info!(
            train_rows = x_train.len(),
            test_rows = x_test.len(),
            features = schema.len(),
            accuracy = evaluation.accuracy,
            auc = evaluation.auc,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training complete"
        );

        Ok(TrainingOutcome {
            scaler,
            classifier,
            schema,
            evaluation,
            search,
            train_rows: x_train.len(),
            test_rows: x_test.len(),
        })
    }

    /// Shuffled train/test index split; the test size is rounded up
    fn split(&self, n: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let n_test = (n as f64 * self.config.test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(PredictorError::insufficient(format!(
                "{} rows cannot be split with test fraction {}",
                n, self.config.test_fraction
            )));
        }
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(self.config.seed));
        let train = indices.split_off(n_test);
        Ok((train, indices))
    }

    fn grid_search(&self, x: &[Vec<f64>], y: &[u8]) -> Result<SearchResult> {
        let folds = stratified_folds(y, self.config.cv_folds);
        let candidates = self.config.grid.candidates();
        if candidates.is_empty() {
            return Err(PredictorError::insufficient("hyperparameter grid is empty"));
        }

        let score = |params: &ForestParams| self.cross_validate(x, y, &folds, *params);
        let scored: Vec<CandidateScore> = if self.config.parallel {
            candidates.par_iter().map(score).collect::<Result<_>>()?
        } else {
            candidates.iter().map(score).collect::<Result<_>>()?
        };

        let mut best = &scored[0];
        for candidate in &scored[1..] {
            if candidate.mean_score > best.mean_score {
                best = candidate;
            }
        }

        Ok(SearchResult {
            best_params: best.params,
            best_score: best.mean_score,
            candidates: scored.clone(),
        })
    }

    fn cross_validate(&self, x: &[Vec<f64>], y: &[u8], folds: &[Vec<usize>], params: ForestParams) -> Result<CandidateScore> {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for (k, test_fold) in folds.iter().enumerate() {
            let mut in_test = vec![false; y.len()];
            test_fold.iter().for_each(|&i| in_test[i] = true);

            let (mut x_fit, mut y_fit) = (Vec::new(), Vec::new());
            for i in (0..y.len()).filter(|&i| !in_test[i]) {
                x_fit.push(x[i].clone());
                y_fit.push(y[i]);
            }

            let forest = RandomForest::fit(&x_fit, &y_fit, params, self.config.seed)?;
            let mut correct = 0usize;
            for &i in test_fold {
                if forest.predict(&x[i])? == y[i] {
                    correct += 1;
                }
            }
            let accuracy = correct as f64 / test_fold.len() as f64;
            debug!(params = %params, fold = k, accuracy, "Scored fold");
            fold_scores.push(accuracy);
        }

        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        Ok(CandidateScore {
            params,
            fold_scores,
            mean_score,
        })
    }
}

/// Split indices into `k` folds preserving class proportions.
///
/// Each class's indices are taken in order and cut into `k` contiguous
/// chunks whose sizes differ by at most one; fold `j` is the union of the
/// `j`-th chunks.
fn stratified_folds(y: &[u8], k: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); k];
    for class in 0..=1u8 {
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        let base = members.len() / k;
        let extra = members.len() % k;
        let mut offset = 0;
        for (j, fold) in folds.iter_mut().enumerate() {
            let size = base + usize::from(j < extra);
            fold.extend_from_slice(&members[offset..offset + size]);
            offset += size;
        }
    }
    folds.iter_mut().for_each(|f| f.sort_unstable());
    folds.retain(|f| !f.is_empty());
    folds
}

/// Evaluate a fitted classifier on scaled rows
pub fn evaluate<C: Classifier>(classifier: &C, x: &[Vec<f64>], y: &[u8]) -> Result<Evaluation> {
    let mut predicted = Vec::with_capacity(x.len());
    let mut scores = Vec::with_capacity(x.len());
    for row in x {
        let p = classifier.predict_proba(row)?;
        predicted.push(label_for(p));
        scores.push(p[1]);
    }
    Ok(Evaluation::compute(y, &predicted, &scores))
}

/// Argmax over the two classes; ties go to class 0
pub fn label_for(probabilities: [f64; 2]) -> u8 {
    u8::from(probabilities[1] > probabilities[0])
}
