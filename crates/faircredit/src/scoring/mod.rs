//! Applicant scoring: feature assembly, the model seam, the scoring adapter
//! and per-decision attribution.

pub mod applicant;
pub mod chart;
pub mod explain;
pub mod features;
pub mod model;
pub mod scorer;
pub mod selections;

pub use applicant::{AgeGroup, ApplicantAttributes, ApplicantError};
pub use explain::{
    Attribution, ExplanationError, FeatureContribution, TreeExplainer, Waterfall, WaterfallBar,
};
pub use features::{Feature, FeatureVector, FEATURE_COUNT};
pub use model::{Classifier, LoadedModel, ModelLoadError, ModelLoader};
pub use scorer::{CreditScorer, ProbabilitySource, ScoringError, ScoringResult};
pub use selections::{DashboardSelections, FinancialStanding, HousingLabel, JobLabel, Sex};

/// Name of the fairness protocol the model was reportedly trained under.
/// Displayed as a declared label only; nothing in the service measures or
/// enforces it.
pub const FAIRNESS_PROTOCOL_LABEL: &str = "Equalized Odds Applied";

/// Assembles, scores and (optionally) explains one applicant against a shared
/// model. Both front ends go through this type so they cannot drift apart.
#[derive(Clone)]
pub struct ScoringPipeline {
    scorer: CreditScorer,
}

/// Everything a front end shows for one scored applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredApplicant {
    pub attributes: ApplicantAttributes,
    pub age_group: AgeGroup,
    pub features: FeatureVector,
    pub result: ScoringResult,
}

impl ScoringPipeline {
    pub fn new(model: &LoadedModel) -> Self {
        Self {
            scorer: CreditScorer::new(model.classifier.clone()),
        }
    }

    pub fn scorer(&self) -> &CreditScorer {
        &self.scorer
    }

    /// Validates the attributes, assembles the vector and scores it.
    pub fn score(&self, attributes: ApplicantAttributes) -> Result<ScoredApplicant, PipelineError> {
        attributes.validate()?;
        let features = FeatureVector::assemble(&attributes);
        let result = self.scorer.score(&features)?;
        Ok(ScoredApplicant {
            age_group: attributes.age_group(),
            attributes,
            features,
            result,
        })
    }

    /// Attribution for an already scored applicant. Failures here never touch
    /// the scoring result.
    pub fn explain(&self, scored: &ScoredApplicant) -> Result<Attribution, ExplanationError> {
        TreeExplainer::new(self.scorer.model())?.explain(&scored.features)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Applicant(#[from] ApplicantError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
