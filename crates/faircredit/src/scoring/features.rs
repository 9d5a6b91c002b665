//! The fixed feature layout shared with the fitted model.
//!
//! Index positions are a contract with the training notebook: the model was
//! fitted on exactly these 20 columns in exactly this order, and it will
//! silently mis-score a vector that deviates from it.

use serde::{Deserialize, Serialize};

use super::applicant::{AgeGroup, ApplicantAttributes};
use super::scorer::ScoringError;

pub const FEATURE_COUNT: usize = 20;

/// Model columns, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Status,
    Duration,
    CreditHistory,
    Purpose,
    CreditAmount,
    Savings,
    Employment,
    InstallmentRate,
    Guarantors,
    ResidenceSince,
    Property,
    Age,
    OtherInstallments,
    ExistingCredits,
    Housing,
    PeopleLiable,
    Job,
    Telephone,
    ForeignWorker,
    AgeGroup,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Status,
        Feature::Duration,
        Feature::CreditHistory,
        Feature::Purpose,
        Feature::CreditAmount,
        Feature::Savings,
        Feature::Employment,
        Feature::InstallmentRate,
        Feature::Guarantors,
        Feature::ResidenceSince,
        Feature::Property,
        Feature::Age,
        Feature::OtherInstallments,
        Feature::ExistingCredits,
        Feature::Housing,
        Feature::PeopleLiable,
        Feature::Job,
        Feature::Telephone,
        Feature::ForeignWorker,
        Feature::AgeGroup,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Column name as it appears in the model artifact.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Status => "status",
            Feature::Duration => "duration",
            Feature::CreditHistory => "credit_history",
            Feature::Purpose => "purpose",
            Feature::CreditAmount => "credit_amount",
            Feature::Savings => "savings",
            Feature::Employment => "employment",
            Feature::InstallmentRate => "installment_rate",
            Feature::Guarantors => "guarantors",
            Feature::ResidenceSince => "residence_since",
            Feature::Property => "property",
            Feature::Age => "age",
            Feature::OtherInstallments => "other_installments",
            Feature::ExistingCredits => "existing_credits",
            Feature::Housing => "housing",
            Feature::PeopleLiable => "people_liable",
            Feature::Job => "job",
            Feature::Telephone => "telephone",
            Feature::ForeignWorker => "foreign_worker",
            Feature::AgeGroup => "age_group",
        }
    }
}

/// Dense model input. The array length is the layout invariant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn zeroed() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    /// Maps applicant attributes onto the model layout. Attributes the caller
    /// did not supply, and every column not collected by either front end,
    /// stay at zero.
    pub fn assemble(applicant: &ApplicantAttributes) -> Self {
        let mut vector = Self::zeroed();

        vector.set(Feature::Status, f64::from(applicant.checking_status));
        vector.set(Feature::Duration, f64::from(applicant.duration_months));
        vector.set(Feature::CreditAmount, applicant.credit_amount);
        vector.set(Feature::Savings, f64::from(applicant.savings));
        vector.set(Feature::Age, f64::from(applicant.age));
        vector.set(Feature::Housing, f64::from(applicant.housing));
        vector.set(Feature::Job, f64::from(applicant.job_skill));

        if let Some(history) = applicant.credit_history {
            vector.set(Feature::CreditHistory, f64::from(history));
        }
        if let Some(purpose) = applicant.purpose {
            vector.set(Feature::Purpose, f64::from(purpose));
        }
        if let Some(employment) = applicant.employment {
            vector.set(Feature::Employment, f64::from(employment));
        }

        vector.set(Feature::AgeGroup, AgeGroup::of(applicant.age).flag());
        vector
    }

    /// Accepts a raw vector from an external caller.
    pub fn from_slice(values: &[f64]) -> Result<Self, ScoringError> {
        let array: [f64; FEATURE_COUNT] =
            values.try_into().map_err(|_| ScoringError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: values.len(),
            })?;
        Ok(Self(array))
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.0[feature.index()] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Column-named view of the vector, in model order.
    pub fn labeled(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |feature| (*feature, self.get(*feature)))
    }

    /// First non-finite entry, if any.
    pub fn first_non_finite(&self) -> Option<(Feature, f64)> {
        self.labeled().find(|(_, value)| !value.is_finite())
    }
}
