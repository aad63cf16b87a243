//! ML prediction engine

mod evaluation;
mod forest;
mod inference;
mod scaler;
mod schema;
mod trainer;

#[cfg(test)]
mod tests;

pub use evaluation::{ClassReport, ConfusionMatrix, Evaluation, RocCurve};
pub use forest::{DecisionTree, ForestParams, RandomForest, DEFAULT_SEED};
pub use inference::{Artifacts, InferencePipeline};
pub use scaler::StandardScaler;
pub use schema::FeatureSchema;
pub use trainer::{
    evaluate, label_for, CandidateScore, ParamGrid, SearchResult, Trainer, TrainerConfig, TrainingOutcome,
    DEFAULT_CV_FOLDS, DEFAULT_TEST_FRACTION,
};

use crate::error::Result;

/// Trait for binary classifiers over scaled feature rows
pub trait Classifier: Send + Sync {
    /// Number of input features the classifier was fitted on
    fn n_features(&self) -> usize;

    /// [P(class 0), P(class 1)] for one scaled row
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2]>;

    /// Most probable class, ties going to class 0
    fn predict(&self, row: &[f64]) -> Result<u8> {
        self.predict_proba(row).map(label_for)
    }
}
