//! Zero-mean / unit-variance feature standardization

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};

/// Per-column standardization fitted on the training partition.
///
/// Uses the population standard deviation; constant columns get a scale of
/// 1.0 so they transform to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| PredictorError::insufficient("cannot fit scaler on zero rows"))?;
        let width = first.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(PredictorError::SchemaMismatch {
                component: "scaler fit",
                expected: width,
                actual: bad.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std < f64::EPSILON {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize one row using the fitted parameters
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(PredictorError::SchemaMismatch {
                component: "scaler",
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_standardizes() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 20.0]);

        let transformed = scaler.transform_all(&rows).unwrap();
        let col0: Vec<f64> = transformed.iter().map(|r| r[0]).collect();
        let mean: f64 = col0.iter().sum::<f64>() / 3.0;
        let var: f64 = col0.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let rows = vec![vec![5.0], vec![5.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.scale(), &[1.0]);
        assert_eq!(scaler.transform(&[5.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_transform_width_mismatch() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let err = scaler.transform(&[1.0]).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_fit_empty() {
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
