//! Held-out evaluation metrics
//!
//! Reporting only; nothing here feeds back into model selection.

use serde::{Deserialize, Serialize};

/// Binary confusion matrix, indexed `[actual][predicted]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Self {
        let mut counts = [[0; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            counts[a as usize][p as usize] += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.counts[0][0] + self.counts[1][1]) as f64 / total as f64
    }

    /// Precision, recall, F1 and support for one class
    pub fn class_report(&self, class: usize) -> ClassReport {
        let tp = self.counts[class][class] as f64;
        let predicted: usize = (0..2).map(|a| self.counts[a][class]).sum();
        let support: usize = self.counts[class].iter().sum();
        let precision = ratio(tp, predicted as f64);
        let recall = ratio(tp, support as f64);
        let f1 = ratio(2.0 * precision * recall, precision + recall);
        ClassReport {
            class: class as u8,
            precision,
            recall,
            f1,
            support,
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Receiver operating characteristic over distinct score thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Decreasing thresholds; the first is +inf (nothing predicted positive)
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Build the curve from true labels and positive-class scores
    pub fn compute(actual: &[u8], scores: &[f64]) -> Self {
        let mut pairs: Vec<(f64, u8)> = scores.iter().copied().zip(actual.iter().copied()).collect();
        pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let positives = actual.iter().filter(|&&a| a == 1).count() as f64;
        let negatives = actual.len() as f64 - positives;

        let mut fpr = vec![0.0];
        let mut tpr = vec![0.0];
        let mut thresholds = vec![f64::INFINITY];
        let (mut tp, mut fp) = (0.0, 0.0);

        for (i, (score, label)) in pairs.iter().enumerate() {
            if *label == 1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            let last_of_threshold = pairs.get(i + 1).map_or(true, |next| next.0 != *score);
            if last_of_threshold {
                fpr.push(ratio(fp, negatives));
                tpr.push(ratio(tp, positives));
                thresholds.push(*score);
            }
        }

        Self { fpr, tpr, thresholds }
    }

    /// Area under the curve by the trapezoidal rule
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }
}

/// Metrics computed on the held-out test partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub classes: [ClassReport; 2],
    pub roc: RocCurve,
    pub auc: f64,
}

impl Evaluation {
    pub fn compute(actual: &[u8], predicted: &[u8], positive_scores: &[f64]) -> Self {
        let confusion = ConfusionMatrix::from_labels(actual, predicted);
        let roc = RocCurve::compute(actual, positive_scores);
        let auc = roc.auc();
        Self {
            accuracy: confusion.accuracy(),
            classes: [confusion.class_report(0), confusion.class_report(1)],
            confusion,
            roc,
            auc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_and_reports() {
        let actual = [1, 1, 1, 0, 0, 0];
        let predicted = [1, 1, 0, 0, 0, 1];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted);
        assert_eq!(cm.counts, [[2, 1], [1, 2]]);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);

        let pos = cm.class_report(1);
        assert!((pos.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((pos.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((pos.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(pos.support, 3);
    }

    #[test]
    fn test_report_with_no_predictions_is_zero() {
        let cm = ConfusionMatrix::from_labels(&[1, 0], &[0, 0]);
        let pos = cm.class_report(1);
        assert_eq!(pos.precision, 0.0);
        assert_eq!(pos.f1, 0.0);
    }

    #[test]
    fn test_perfect_roc() {
        let roc = RocCurve::compute(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]);
        assert!((roc.auc() - 1.0).abs() < 1e-12);
        assert_eq!(roc.fpr.first(), Some(&0.0));
        assert_eq!(roc.tpr.last(), Some(&1.0));
    }

    #[test]
    fn test_inverted_and_tied_roc() {
        let inverted = RocCurve::compute(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]);
        assert!(inverted.auc().abs() < 1e-12);

        let tied = RocCurve::compute(&[1, 0, 1, 0], &[0.5; 4]);
        assert!((tied.auc() - 0.5).abs() < 1e-12);
        assert_eq!(tied.thresholds.len(), 2);
    }

    #[test]
    fn test_known_auc() {
        // 3 of 4 positive/negative pairs ranked correctly
        let roc = RocCurve::compute(&[0, 1, 0, 1], &[0.1, 0.4, 0.5, 0.8]);
        assert!((roc.auc() - 0.75).abs() < 1e-12);
    }
}
