use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Deterministic per-feature transform applied to raw measurements before
/// classification. Implementations hold no request state.
pub trait Scaler: Send + Sync {
    fn n_features(&self) -> usize;

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Centers every feature on its training mean and divides by its training
/// standard deviation (population variance, as the training pipeline used).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.mean.len(),
                got: self.scale.len(),
            });
        }
        if let Some(index) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(ModelError::NonFinite { index });
        }
        if let Some(index) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(ModelError::NonFinite { index });
        }
        Ok(())
    }

    pub fn fit(records: ArrayView2<f64>) -> Result<Self> {
        if records.nrows() == 0 {
            return Err(ModelError::EmptyDataset);
        }
        let mean = records
            .mean_axis(Axis(0))
            .ok_or(ModelError::EmptyDataset)?;
        // Constant features keep their offset but are not rescaled.
        let scale = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s <= f64::EPSILON { 1.0 } else { s });

        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.mean.len(),
                got: features.len(),
            });
        }
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(index, (x, (mean, scale)))| {
                if x.is_finite() {
                    Ok((x - mean) / scale)
                } else {
                    Err(ModelError::NonFinite { index })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fit_centers_and_scales() {
        let records = array![[1.0, 10.0], [3.0, 20.0], [5.0, 30.0]];
        let scaler = StandardScaler::fit(records.view()).unwrap();

        assert_eq!(scaler.mean(), &[3.0, 20.0]);
        let expected_std = (8.0f64 / 3.0).sqrt();
        assert!((scaler.scale()[0] - expected_std).abs() < 1e-12);

        let scaled = scaler.transform(&[3.0, 20.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.0]);

        let scaled = scaler.transform(&[5.0, 30.0]).unwrap();
        assert!((scaled[0] - 2.0 / expected_std).abs() < 1e-12);
        assert!((scaled[0] - scaled[1]).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_is_only_centered() {
        let records = array![[2.0, 1.0], [2.0, 3.0]];
        let scaler = StandardScaler::fit(records.view()).unwrap();
        assert_eq!(scaler.scale()[0], 1.0);
        assert_eq!(scaler.transform(&[4.0, 2.0]).unwrap(), vec![2.0, 0.0]);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let scaler = StandardScaler::new(vec![0.0; 4], vec![1.0; 4]).unwrap();
        let err = scaler.transform(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let scaler = StandardScaler::new(vec![0.0; 2], vec![1.0; 2]).unwrap();
        let err = scaler.transform(&[1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, ModelError::NonFinite { index: 1 }));
    }

    #[test]
    fn zero_scale_is_rejected_on_construction() {
        assert!(StandardScaler::new(vec![0.0, 0.0], vec![1.0, 0.0]).is_err());
        assert!(StandardScaler::new(vec![0.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn empty_dataset_cannot_be_fitted() {
        let records = ndarray::Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            StandardScaler::fit(records.view()),
            Err(ModelError::EmptyDataset)
        ));
    }
}
