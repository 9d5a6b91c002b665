//! Translation of the dashboard's human-readable form into ordinal codes.
//!
//! The dashboard does not collect checking, savings, credit history or
//! employment individually; a coarse financial-standing tier stands in for
//! all four.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::applicant::{ApplicantAttributes, ApplicantError};

/// Purpose code submitted for every dashboard application (radio/television).
pub const DASHBOARD_LOAN_PURPOSE: u8 = 4;

/// Credit amounts the dashboard form accepts.
pub const CREDIT_AMOUNT_RANGE: RangeInclusive<f64> = 100.0..=20000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HousingLabel {
    #[default]
    Own,
    Rent,
    Free,
}

impl HousingLabel {
    pub fn code(self) -> u8 {
        match self {
            HousingLabel::Own => 2,
            HousingLabel::Rent => 1,
            HousingLabel::Free => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobLabel {
    #[default]
    Unskilled,
    Skilled,
    Management,
}

impl JobLabel {
    pub fn code(self) -> u8 {
        match self {
            JobLabel::Unskilled => 0,
            JobLabel::Skilled => 2,
            JobLabel::Management => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinancialStanding {
    #[default]
    Wealthy,
    Average,
    Poor,
}

/// Codes a standing tier fixes at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingCodes {
    pub checking_status: u8,
    pub savings: u8,
    pub credit_history: u8,
    pub employment: u8,
}

impl FinancialStanding {
    pub fn codes(self) -> StandingCodes {
        let (checking_status, savings, credit_history, employment) = match self {
            FinancialStanding::Wealthy => (2, 3, 2, 3),
            FinancialStanding::Average => (1, 1, 2, 2),
            FinancialStanding::Poor => (0, 0, 0, 0),
        };
        StandingCodes {
            checking_status,
            savings,
            credit_history,
            employment,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FinancialStanding::Wealthy => "Wealthy (High Savings)",
            FinancialStanding::Average => "Average",
            FinancialStanding::Poor => "Poor (In Debt)",
        }
    }
}

/// Raw dashboard form values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSelections {
    pub age: u32,
    pub credit_amount: f64,
    pub duration_months: u32,
    /// Shown back to the operator only; not a model column.
    pub sex: Sex,
    pub housing: HousingLabel,
    pub job: JobLabel,
    pub standing: FinancialStanding,
}

impl Default for DashboardSelections {
    fn default() -> Self {
        Self {
            age: 24,
            credit_amount: 4000.0,
            duration_months: 24,
            sex: Sex::default(),
            housing: HousingLabel::default(),
            job: JobLabel::default(),
            standing: FinancialStanding::default(),
        }
    }
}

impl DashboardSelections {
    /// Form-level bounds on top of [`ApplicantAttributes::validate`].
    pub fn validate(&self) -> Result<(), ApplicantError> {
        if CREDIT_AMOUNT_RANGE.contains(&self.credit_amount) {
            Ok(())
        } else {
            Err(ApplicantError::CreditAmountOutOfRange {
                value: self.credit_amount,
                min: *CREDIT_AMOUNT_RANGE.start(),
                max: *CREDIT_AMOUNT_RANGE.end(),
            })
        }
    }

    pub fn to_attributes(&self) -> ApplicantAttributes {
        let codes = self.standing.codes();
        ApplicantAttributes {
            age: self.age,
            credit_amount: self.credit_amount,
            duration_months: self.duration_months,
            checking_status: codes.checking_status,
            savings: codes.savings,
            job_skill: self.job.code(),
            housing: self.housing.code(),
            credit_history: Some(codes.credit_history),
            employment: Some(codes.employment),
            purpose: Some(DASHBOARD_LOAN_PURPOSE),
        }
    }
}
