use linfa::DatasetBase;
use linfa::traits::Fit;
use linfa_bayes::{GaussianNb, NaiveBayes};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Trained decision model over scaled feature vectors.
///
/// `predict` returns a class index in `0..n_classes()`; `predict_proba`
/// returns one probability per class in the same index order.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    fn n_classes(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<usize>;

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Scaled inputs are clamped to this magnitude so squared distances over
/// the smoothed variances stay finite.
const FEATURE_LIMIT: f64 = 1e100;

/// Gaussian naive Bayes over classes `0..n_classes`, fitted with linfa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    n_features: usize,
    n_classes: usize,
    model: GaussianNb<f64, usize>,
}

impl GaussianNaiveBayes {
    pub fn fit(
        records: ArrayView2<f64>,
        targets: ArrayView1<usize>,
        n_classes: usize,
    ) -> Result<Self> {
        let n_samples = records.nrows();
        if n_samples == 0 || n_classes == 0 {
            return Err(ModelError::EmptyDataset);
        }
        if targets.len() != n_samples {
            return Err(ModelError::DimensionMismatch {
                expected: n_samples,
                got: targets.len(),
            });
        }
        if let Some(&target) = targets.iter().find(|&&t| t >= n_classes) {
            return Err(ModelError::UnknownTarget { target, n_classes });
        }
        if let Some(class) = (0..n_classes).find(|class| !targets.iter().any(|t| t == class)) {
            return Err(ModelError::EmptyClass { class });
        }

        let dataset = DatasetBase::from(records.to_owned()).with_targets(targets.to_owned());
        let model = GaussianNb::<f64, usize>::params().fit(&dataset)?;

        Ok(Self {
            n_features: records.ncols(),
            n_classes,
            model,
        })
    }

    /// Checks that the fitted parameters are usable, mainly for artifacts
    /// that were decoded from disk: every class must be present and score a
    /// finite likelihood.
    pub fn validate(&self) -> Result<()> {
        if self.n_classes == 0 || self.n_features == 0 {
            return Err(ModelError::EmptyDataset);
        }
        self.joint_log_likelihood(&vec![0.0; self.n_features])
            .map(|_| ())
    }

    /// Unnormalized log posterior per class, in class index order. Every
    /// score is finite.
    fn joint_log_likelihood(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                got: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|x| x.is_nan()) {
            return Err(ModelError::NonFinite { index });
        }

        let clamped: Vec<f64> = features
            .iter()
            .map(|x| x.clamp(-FEATURE_LIMIT, FEATURE_LIMIT))
            .collect();
        let row = ArrayView2::from_shape((1, self.n_features), &clamped)?;
        let jll = self.model.joint_log_likelihood(row);

        (0..self.n_classes)
            .map(|class| {
                let score = jll
                    .get(&class)
                    .and_then(|scores| scores.first().copied())
                    .ok_or(ModelError::EmptyClass { class })?;
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(ModelError::NonFinite { index: class })
                }
            })
            .collect()
    }
}

impl Classifier for GaussianNaiveBayes {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, features: &[f64]) -> Result<usize> {
        let jll = self.joint_log_likelihood(features)?;
        let mut best = 0;
        for (class, value) in jll.iter().enumerate().skip(1) {
            if *value > jll[best] {
                best = class;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let jll = self.joint_log_likelihood(features)?;
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = jll.iter().map(|v| (v - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        Ok(exp.into_iter().map(|v| v / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn two_blobs() -> GaussianNaiveBayes {
        let records = array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [5.0, 5.1],
            [5.2, 4.9],
            [4.9, 5.0],
        ];
        let targets = array![0, 0, 0, 1, 1, 1];
        GaussianNaiveBayes::fit(records.view(), targets.view(), 2).unwrap()
    }

    fn assert_distribution(model: &GaussianNaiveBayes, point: &[f64]) {
        let proba = model.predict_proba(point).unwrap();
        assert_eq!(proba.len(), 2);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)), "{proba:?}");
        let sum: f64 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let argmax = if proba[1] > proba[0] { 1 } else { 0 };
        assert_eq!(model.predict(point).unwrap(), argmax);
    }

    #[test]
    fn separates_two_blobs() {
        let model = two_blobs();
        assert_eq!(model.n_classes(), 2);
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.predict(&[0.1, 0.0]).unwrap(), 0);
        assert_eq!(model.predict(&[5.1, 5.0]).unwrap(), 1);
    }

    #[test]
    fn probabilities_form_a_distribution() {
        let model = two_blobs();
        for point in [[0.0, 0.0], [2.5, 2.5], [5.0, 5.0], [40.0, -3.0]] {
            assert_distribution(&model, &point);
        }
    }

    #[test]
    fn extreme_inputs_still_rank_consistently() {
        let model = two_blobs();
        for point in [
            [1e200, 5.0],
            [-1e300, 0.0],
            [f64::MAX, f64::MAX],
            [f64::INFINITY, 0.0],
        ] {
            assert_distribution(&model, &point);
        }
    }

    #[test]
    fn nan_input_is_rejected() {
        let model = two_blobs();
        assert!(matches!(
            model.predict_proba(&[0.0, f64::NAN]),
            Err(ModelError::NonFinite { index: 1 })
        ));
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let model = two_blobs();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ModelError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert!(model.predict_proba(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn targets_outside_class_range_are_rejected() {
        let records = array![[0.0], [1.0]];
        let targets = array![0, 3];
        let err = GaussianNaiveBayes::fit(records.view(), targets.view(), 2).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownTarget {
                target: 3,
                n_classes: 2
            }
        ));
    }

    #[test]
    fn class_without_samples_is_rejected() {
        let records = array![[0.0], [1.0]];
        let targets = array![0, 0];
        let err = GaussianNaiveBayes::fit(records.view(), targets.view(), 2).unwrap_err();
        assert!(matches!(err, ModelError::EmptyClass { class: 1 }));
    }

    #[test]
    fn decoded_parameters_are_validated() {
        let model = two_blobs();
        assert!(model.validate().is_ok());
        let encoded = serde_json::to_value(&model).unwrap();

        let decoded: GaussianNaiveBayes = serde_json::from_value(encoded.clone()).unwrap();
        assert_eq!(decoded, model);

        let mut extra_class = encoded.clone();
        extra_class["n_classes"] = json!(3);
        let decoded: GaussianNaiveBayes = serde_json::from_value(extra_class).unwrap();
        assert!(matches!(
            decoded.validate(),
            Err(ModelError::EmptyClass { class: 2 })
        ));

        let mut zero_variance = encoded;
        zero_variance["model"]["class_info"]["1"]["sigma"]["data"] = json!([0.0, 0.0]);
        let decoded: GaussianNaiveBayes = serde_json::from_value(zero_variance).unwrap();
        assert!(decoded.validate().is_err());
    }
}
