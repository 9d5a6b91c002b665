use serde::{Deserialize, Serialize};

use super::{Classifier, ModelLoadError};
use crate::scoring::features::{FeatureVector, FEATURE_COUNT};
use crate::scoring::scorer::ScoringError;

/// Hard-margin linear classifier. It only exposes a decision: no calibrated
/// probabilities and no tree structure to attribute over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl LinearClassifier {
    pub fn decision_function(&self, features: &FeatureVector) -> f64 {
        self.weights
            .iter()
            .zip(features.as_slice())
            .fold(self.intercept, |total, (weight, value)| total + weight * value)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelLoadError> {
        if self.weights.len() != FEATURE_COUNT {
            return Err(ModelLoadError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: self.weights.len(),
            });
        }
        if !self.intercept.is_finite() {
            return Err(ModelLoadError::NonFiniteParameter("intercept"));
        }
        if self.weights.iter().any(|weight| !weight.is_finite()) {
            return Err(ModelLoadError::NonFiniteParameter("weights"));
        }
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn predict(&self, features: &FeatureVector) -> Result<bool, ScoringError> {
        Ok(self.decision_function(features) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::features::Feature;

    #[test]
    fn decision_is_the_sign_of_the_margin() {
        let mut weights = vec![0.0; FEATURE_COUNT];
        weights[Feature::Savings.index()] = 1.0;
        let model = LinearClassifier {
            intercept: -2.0,
            weights,
        };

        let mut vector = FeatureVector::zeroed();
        assert_eq!(model.predict(&vector), Ok(false));
        vector.set(Feature::Savings, 3.0);
        assert_eq!(model.predict(&vector), Ok(true));
        assert!(model.predict_proba(&vector).is_none());
        assert!(model.as_tree_ensemble().is_none());
    }

    #[test]
    fn validate_requires_one_weight_per_feature() {
        let model = LinearClassifier {
            intercept: 0.0,
            weights: vec![0.1; 7],
        };
        assert!(matches!(
            model.validate(),
            Err(ModelLoadError::FeatureCount {
                expected: 20,
                actual: 7
            })
        ));
    }
}
