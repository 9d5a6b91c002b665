use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Applicants strictly older than this are in the standard (adult) group.
pub const PROTECTED_AGE_CEILING: u32 = 25;

pub const AGE_RANGE: RangeInclusive<u32> = 18..=100;
pub const DURATION_RANGE: RangeInclusive<u32> = 4..=72;
pub const CHECKING_STATUS_RANGE: RangeInclusive<u8> = 0..=3;
pub const SAVINGS_RANGE: RangeInclusive<u8> = 0..=4;
pub const JOB_SKILL_RANGE: RangeInclusive<u8> = 0..=3;
pub const HOUSING_RANGE: RangeInclusive<u8> = 0..=2;
pub const CREDIT_HISTORY_RANGE: RangeInclusive<u8> = 0..=4;
pub const EMPLOYMENT_RANGE: RangeInclusive<u8> = 0..=4;
pub const PURPOSE_RANGE: RangeInclusive<u8> = 0..=10;

/// Age cohort used both for the model's `age_group` column and for the
/// protected-group badge shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    /// 25 or younger; the cohort fairness reporting is tracked for.
    Youth,
    Adult,
}

impl AgeGroup {
    pub fn of(age: u32) -> Self {
        if age > PROTECTED_AGE_CEILING {
            AgeGroup::Adult
        } else {
            AgeGroup::Youth
        }
    }

    pub fn is_protected(self) -> bool {
        matches!(self, AgeGroup::Youth)
    }

    /// Encoding of the `age_group` model column.
    pub fn flag(self) -> f64 {
        match self {
            AgeGroup::Adult => 1.0,
            AgeGroup::Youth => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Youth => "Protected Group: YOUTH",
            AgeGroup::Adult => "Group: ADULT (Standard)",
        }
    }
}

/// Everything a front end knows about one applicant, already in ordinal
/// codes. The optional fields are only collected by some front ends; absent
/// values encode as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantAttributes {
    pub age: u32,
    pub credit_amount: f64,
    pub duration_months: u32,
    pub checking_status: u8,
    pub savings: u8,
    pub job_skill: u8,
    pub housing: u8,
    #[serde(default)]
    pub credit_history: Option<u8>,
    #[serde(default)]
    pub employment: Option<u8>,
    #[serde(default)]
    pub purpose: Option<u8>,
}

impl ApplicantAttributes {
    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::of(self.age)
    }

    pub fn validate(&self) -> Result<(), ApplicantError> {
        check_range("age", self.age, &AGE_RANGE)?;
        check_range("duration", self.duration_months, &DURATION_RANGE)?;

        if !self.credit_amount.is_finite() || self.credit_amount <= 0.0 {
            return Err(ApplicantError::InvalidCreditAmount(self.credit_amount));
        }

        check_range(
            "checking_status",
            u32::from(self.checking_status),
            &widen(&CHECKING_STATUS_RANGE),
        )?;
        check_range("savings", u32::from(self.savings), &widen(&SAVINGS_RANGE))?;
        check_range(
            "job_skill",
            u32::from(self.job_skill),
            &widen(&JOB_SKILL_RANGE),
        )?;
        check_range("housing", u32::from(self.housing), &widen(&HOUSING_RANGE))?;

        if let Some(history) = self.credit_history {
            check_range(
                "credit_history",
                u32::from(history),
                &widen(&CREDIT_HISTORY_RANGE),
            )?;
        }
        if let Some(employment) = self.employment {
            check_range(
                "employment",
                u32::from(employment),
                &widen(&EMPLOYMENT_RANGE),
            )?;
        }
        if let Some(purpose) = self.purpose {
            check_range("purpose", u32::from(purpose), &widen(&PURPOSE_RANGE))?;
        }

        Ok(())
    }
}

fn widen(range: &RangeInclusive<u8>) -> RangeInclusive<u32> {
    u32::from(*range.start())..=u32::from(*range.end())
}

fn check_range(
    field: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), ApplicantError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ApplicantError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicantError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("credit_amount must be a positive number (got {0})")]
    InvalidCreditAmount(f64),
    #[error("credit_amount must be between {min} and {max} (got {value})")]
    CreditAmountOutOfRange { value: f64, min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant() -> ApplicantAttributes {
        ApplicantAttributes {
            age: 30,
            credit_amount: 5000.0,
            duration_months: 24,
            checking_status: 1,
            savings: 2,
            job_skill: 1,
            housing: 1,
            credit_history: None,
            employment: None,
            purpose: None,
        }
    }

    #[test]
    fn age_group_boundary_is_strictly_greater_than_25() {
        assert_eq!(AgeGroup::of(25), AgeGroup::Youth);
        assert_eq!(AgeGroup::of(26), AgeGroup::Adult);
        for age in AGE_RANGE {
            let group = AgeGroup::of(age);
            assert_eq!(group.flag() == 1.0, age > 25, "age {age}");
            assert_eq!(group.is_protected(), age <= 25, "age {age}");
        }
    }

    #[test]
    fn validate_accepts_reference_applicant() {
        assert_eq!(applicant().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_out_of_range_codes() {
        let mut profile = applicant();
        profile.savings = 5;
        assert_eq!(
            profile.validate(),
            Err(ApplicantError::OutOfRange {
                field: "savings",
                value: 5,
                min: 0,
                max: 4,
            })
        );

        let mut profile = applicant();
        profile.age = 17;
        let err = profile.validate().expect_err("minor rejected");
        assert_eq!(err.to_string(), "age must be between 18 and 100 (got 17)");

        let mut profile = applicant();
        profile.duration_months = 73;
        assert!(matches!(
            profile.validate(),
            Err(ApplicantError::OutOfRange {
                field: "duration",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_credit_amount() {
        let mut profile = applicant();
        profile.credit_amount = 0.0;
        assert_eq!(
            profile.validate(),
            Err(ApplicantError::InvalidCreditAmount(0.0))
        );

        profile.credit_amount = f64::INFINITY;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn validate_checks_optional_codes_when_present() {
        let mut profile = applicant();
        profile.credit_history = Some(9);
        assert!(matches!(
            profile.validate(),
            Err(ApplicantError::OutOfRange {
                field: "credit_history",
                ..
            })
        ));
    }
}
