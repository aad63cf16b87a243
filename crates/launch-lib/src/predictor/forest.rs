//! Random forest classifier for binary launch suitability
//!
//! Bootstrap-sampled CART trees split on Gini impurity, considering a random
//! subset of sqrt(n_features) columns at each node. Class probabilities are
//! the mean of the per-tree leaf distributions. Every tree draws its seed from
//! a master RNG seeded with the forest seed, so fitting is reproducible and
//! independent of how rayon schedules the trees.

use super::Classifier;
use crate::error::{PredictorError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seed used for the train/test split and the forest
pub const DEFAULT_SEED: u64 = 42;

/// Hyperparameters for one forest configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.max_depth.map(|d| d.to_string()).unwrap_or_else(|| "none".to_string());
        write!(
            f,
            "n_estimators={} max_depth={} min_samples_split={}",
            self.n_trees, depth, self.min_samples_split
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        probabilities: [f64; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART tree stored as a flat node arena (root at index 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    params: ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: [f64; 2]) -> f64 {
    let total = counts[0] + counts[1];
    if total == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] / total;
    let p1 = counts[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

fn class_counts(y: &[u8], samples: &[usize]) -> [f64; 2] {
    let mut counts = [0.0; 2];
    for &i in samples {
        counts[y[i] as usize] += 1.0;
    }
    counts
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let counts = class_counts(self.y, &samples);
        let n = samples.len();
        let pure = counts[0] == 0.0 || counts[1] == 0.0;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);

        if pure || depth_reached || n < self.params.min_samples_split {
            return self.leaf(counts);
        }

        let Some(split) = self.find_split(&samples) else {
            return self.leaf(counts);
        };

        let x = self.x;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        self.importances[split.feature] += n as f64 * gini(counts) - split.impurity;

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probabilities: [0.0; 2],
        });
        let left_idx = self.build(left, depth + 1);
        let right_idx = self.build(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }

    fn leaf(&mut self, counts: [f64; 2]) -> usize {
        let total = counts[0] + counts[1];
        let probabilities = if total > 0.0 {
            [counts[0] / total, counts[1] / total]
        } else {
            [0.5, 0.5]
        };
        self.nodes.push(Node::Leaf { probabilities });
        self.nodes.len() - 1
    }

    /// Best split over a random feature subset; if none of the drawn features
    /// can split the node, keep drawing from the remaining ones.
    fn find_split(&mut self, samples: &[usize]) -> Option<BestSplit> {
        let n_features = self.x[0].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_threshold(samples, feature) {
                if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Sweep sorted values of one feature; impurity is weighted by sample count
    fn best_threshold(&self, samples: &[usize], feature: usize) -> Option<BestSplit> {
        let mut sorted: Vec<(f64, u8)> = samples.iter().map(|&i| (self.x[i][feature], self.y[i])).collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        if sorted.len() < 2 {
            return None;
        }
        let total = class_counts(self.y, samples);
        let mut left = [0.0; 2];
        let mut best: Option<BestSplit> = None;

        for i in 0..sorted.len() - 1 {
            left[sorted[i].1 as usize] += 1.0;
            let (value, next) = (sorted[i].0, sorted[i + 1].0);
            if next <= value {
                continue;
            }
            let right = [total[0] - left[0], total[1] - left[1]];
            let n_left = (i + 1) as f64;
            let n_right = sorted.len() as f64 - n_left;
            let impurity = n_left * gini(left) + n_right * gini(right);
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

impl DecisionTree {
    fn fit(x: &[Vec<f64>], y: &[u8], samples: Vec<usize>, params: ForestParams, seed: u64) -> (Self, Vec<f64>) {
        let n_features = x[0].len();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            max_features,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.build(samples, 0);
        (
            Self {
                nodes: builder.nodes,
            },
            builder.importances,
        )
    }

    fn leaf_probabilities(&self, row: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { probabilities } => return *probabilities,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Children always follow their parent in the arena, which also rules out cycles
    fn is_valid(&self, n_features: usize) -> bool {
        let len = self.nodes.len();
        len > 0
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Leaf { .. } => true,
                Node::Split {
                    feature, left, right, ..
                } => *feature < n_features && (idx + 1..len).contains(left) && (idx + 1..len).contains(right),
            })
    }
}

/// Fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    n_features: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on scaled rows and 0/1 labels
    pub fn fit(x: &[Vec<f64>], y: &[u8], params: ForestParams, seed: u64) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PredictorError::insufficient(format!(
                "forest needs matching non-empty rows and labels (rows={}, labels={})",
                x.len(),
                y.len()
            )));
        }
        if y.iter().any(|&label| label > 1) {
            return Err(PredictorError::insufficient("labels must be 0 or 1"));
        }
        if params.n_trees == 0 || params.min_samples_split < 2 {
            return Err(PredictorError::insufficient(format!("invalid forest parameters: {}", params)));
        }
        let n_features = x[0].len();
        if let Some(bad) = x.iter().find(|r| r.len() != n_features) {
            return Err(PredictorError::SchemaMismatch {
                component: "forest fit",
                expected: n_features,
                actual: bad.len(),
            });
        }

        let mut master = StdRng::seed_from_u64(seed);
        let tree_seeds: Vec<u64> = (0..params.n_trees).map(|_| master.gen()).collect();
        let n = x.len();

        let fitted: Vec<(DecisionTree, Vec<f64>)> = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, y, samples, params, rng.gen())
            })
            .collect();

        let mut feature_importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, importances) in fitted {
            let total: f64 = importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in feature_importances.iter_mut().zip(&importances) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            feature_importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            params,
            seed,
            n_features,
            trees,
            feature_importances,
        })
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Normalized mean decrease in impurity, one entry per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Structural sanity check used after deserialization
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        match self.trees.iter().position(|t| !t.is_valid(self.n_features)) {
            Some(i) => Err(format!("tree {} references nodes or features out of range", i)),
            None => Ok(()),
        }
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2]> {
        if row.len() != self.n_features {
            return Err(PredictorError::SchemaMismatch {
                component: "classifier",
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let mut sum = [0.0; 2];
        for tree in &self.trees {
            let p = tree.leaf_probabilities(row);
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two clusters separated on the first feature; the second is noise.
    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let label = (i % 2) as u8;
            let base = if label == 1 { 2.0 } else { -2.0 };
            x.push(vec![base + (i % 5) as f64 * 0.1, (i % 7) as f64]);
            y.push(label);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            ..Default::default()
        }
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable(40);
        let forest = RandomForest::fit(&x, &y, small_params(), DEFAULT_SEED).unwrap();
        assert_eq!(forest.trees().len(), 15);
        let correct = x
            .iter()
            .zip(&y)
            .filter(|(row, label)| forest.predict(row).unwrap() == **label)
            .count();
        assert!(correct >= 38, "only {correct}/40 correct");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable(30);
        let forest = RandomForest::fit(&x, &y, small_params(), DEFAULT_SEED).unwrap();
        for row in &x {
            let p = forest.predict_proba(row).unwrap();
            assert!((p[0] + p[1] - 1.0).abs() < 1e-9);
            assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable(30);
        let a = RandomForest::fit(&x, &y, small_params(), 7).unwrap();
        let b = RandomForest::fit(&x, &y, small_params(), 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_depth_respected() {
        let (x, y) = separable(60);
        let params = ForestParams {
            n_trees: 5,
            max_depth: Some(1),
            min_samples_split: 2,
        };
        let forest = RandomForest::fit(&x, &y, params, DEFAULT_SEED).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn test_min_samples_split_larger_than_data_gives_stumps() {
        let (x, y) = separable(10);
        let params = ForestParams {
            n_trees: 3,
            max_depth: None,
            min_samples_split: 50,
        };
        let forest = RandomForest::fit(&x, &y, params, DEFAULT_SEED).unwrap();
        assert!(forest.trees().iter().all(|t| t.node_count() == 1));
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let (x, y) = separable(60);
        let forest = RandomForest::fit(&x, &y, small_params(), DEFAULT_SEED).unwrap();
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_predict_wrong_width() {
        let (x, y) = separable(10);
        let forest = RandomForest::fit(&x, &y, small_params(), DEFAULT_SEED).unwrap();
        assert!(matches!(
            forest.predict_proba(&[1.0]),
            Err(PredictorError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(RandomForest::fit(&[], &[], small_params(), 1).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[2], small_params(), 1).is_err());
        let params = ForestParams {
            n_trees: 0,
            ..Default::default()
        };
        assert!(RandomForest::fit(&[vec![1.0]], &[1], params, 1).is_err());
    }

    #[test]
    fn test_serde_preserves_structure() {
        let (x, y) = separable(20);
        let forest = RandomForest::fit(&x, &y, small_params(), DEFAULT_SEED).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.predict_proba(&x[3]).unwrap(), forest.predict_proba(&x[3]).unwrap());
    }

    #[test]
    fn test_display_params() {
        assert_eq!(
            ForestParams::default().to_string(),
            "n_estimators=100 max_depth=none min_samples_split=2"
        );
    }
}
