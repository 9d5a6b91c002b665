use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{Feature, FeatureVector};
use super::model::Classifier;

/// Where the reported confidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilitySource {
    Model,
    /// The model has no probability estimates; the decision is reported as
    /// the confidence.
    Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub approved: bool,
    /// Probability of the positive (approved) class.
    pub confidence: f64,
    pub probability_source: ProbabilitySource,
}

impl ScoringResult {
    /// Probability of the negative class, shown for rejections.
    pub fn risk(&self) -> f64 {
        1.0 - self.confidence
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("feature vector must have {expected} entries (got {actual})")]
    FeatureCount { expected: usize, actual: usize },
    #[error("feature '{name}' is not a finite number ({value})", name = .feature.name())]
    NonFiniteFeature { feature: Feature, value: f64 },
    #[error("model returned an invalid probability ({0})")]
    InvalidProbability(f64),
    #[error("model failed to score the applicant: {0}")]
    Model(String),
}

/// Adapter over the loaded classifier. Holds nothing mutable, so one
/// instance serves every request.
#[derive(Clone)]
pub struct CreditScorer {
    model: Arc<dyn Classifier>,
}

impl CreditScorer {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn score(&self, features: &FeatureVector) -> Result<ScoringResult, ScoringError> {
        if let Some((feature, value)) = features.first_non_finite() {
            return Err(ScoringError::NonFiniteFeature { feature, value });
        }

        let approved = self.model.predict(features)?;

        let (confidence, probability_source) = match self.model.predict_proba(features) {
            Some(probability) => {
                let probability = probability?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ScoringError::InvalidProbability(probability));
                }
                (probability, ProbabilitySource::Model)
            }
            None => (
                if approved { 1.0 } else { 0.0 },
                ProbabilitySource::Decision,
            ),
        };

        debug!(
            model = self.model.kind(),
            approved,
            confidence,
            source = ?probability_source,
            "applicant scored"
        );

        Ok(ScoringResult {
            approved,
            confidence,
            probability_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HardMargin;

    impl Classifier for HardMargin {
        fn kind(&self) -> &'static str {
            "hard_margin"
        }

        fn predict(&self, features: &FeatureVector) -> Result<bool, ScoringError> {
            Ok(features.get(Feature::Savings) >= 2.0)
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn kind(&self) -> &'static str {
            "broken"
        }

        fn predict(&self, _features: &FeatureVector) -> Result<bool, ScoringError> {
            Err(ScoringError::Model("tree 3 is corrupt".to_string()))
        }
    }

    struct Overconfident;

    impl Classifier for Overconfident {
        fn kind(&self) -> &'static str {
            "overconfident"
        }

        fn predict(&self, _features: &FeatureVector) -> Result<bool, ScoringError> {
            Ok(true)
        }

        fn predict_proba(&self, _features: &FeatureVector) -> Option<Result<f64, ScoringError>> {
            Some(Ok(1.7))
        }
    }

    #[test]
    fn falls_back_to_decision_without_probabilities() {
        let scorer = CreditScorer::new(Arc::new(HardMargin));

        let mut vector = FeatureVector::zeroed();
        vector.set(Feature::Savings, 3.0);
        let approved = scorer.score(&vector).expect("scores");
        assert!(approved.approved);
        assert_eq!(approved.confidence, 1.0);
        assert_eq!(approved.probability_source, ProbabilitySource::Decision);

        let rejected = scorer.score(&FeatureVector::zeroed()).expect("scores");
        assert!(!rejected.approved);
        assert_eq!(rejected.confidence, 0.0);
        assert_eq!(rejected.risk(), 1.0);
    }

    #[test]
    fn surfaces_model_failures() {
        let scorer = CreditScorer::new(Arc::new(Broken));
        let err = scorer
            .score(&FeatureVector::zeroed())
            .expect_err("failure propagates");
        assert_eq!(
            err.to_string(),
            "model failed to score the applicant: tree 3 is corrupt"
        );
    }

    #[test]
    fn rejects_non_finite_input_before_calling_the_model() {
        let scorer = CreditScorer::new(Arc::new(Broken));
        let mut vector = FeatureVector::zeroed();
        vector.set(Feature::Duration, f64::INFINITY);

        let err = scorer.score(&vector).expect_err("infinite duration");
        assert!(matches!(
            err,
            ScoringError::NonFiniteFeature {
                feature: Feature::Duration,
                ..
            }
        ));
    }

    #[test]
    fn rejects_probabilities_outside_unit_interval() {
        let scorer = CreditScorer::new(Arc::new(Overconfident));
        let err = scorer
            .score(&FeatureVector::zeroed())
            .expect_err("probability above one");
        assert_eq!(err, ScoringError::InvalidProbability(1.7));
    }
}
