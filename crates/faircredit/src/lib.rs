//! Core of the FairCredit scoring service.
//!
//! Both front ends (the prediction API and the interactive dashboard) build on
//! the same pipeline: applicant attributes are assembled into the fixed
//! 20-slot feature vector the fitted model expects, scored through the
//! [`scoring::Classifier`] seam and, on request, explained with Tree SHAP.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
