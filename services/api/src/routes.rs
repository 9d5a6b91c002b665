use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use faircredit::error::AppError;
use faircredit::scoring::{
    ApplicantAttributes, Attribution, FeatureContribution, FeatureVector, ProbabilitySource,
    ScoredApplicant, Waterfall, FAIRNESS_PROTOCOL_LABEL,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Request body of `/predict`, using the API's field names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct LoanApplication {
    pub(crate) age: u32,
    pub(crate) credit_amount: f64,
    pub(crate) duration: u32,
    pub(crate) checking_status: u8,
    pub(crate) savings: u8,
    pub(crate) job_skill: u8,
    pub(crate) housing: u8,
}

impl From<LoanApplication> for ApplicantAttributes {
    fn from(value: LoanApplication) -> Self {
        ApplicantAttributes {
            age: value.age,
            credit_amount: value.credit_amount,
            duration_months: value.duration,
            checking_status: value.checking_status,
            savings: value.savings,
            job_skill: value.job_skill,
            housing: value.housing,
            credit_history: None,
            employment: None,
            purpose: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionResponse {
    pub(crate) loan_approved: bool,
    pub(crate) confidence_score: f64,
    pub(crate) fairness_check: &'static str,
    pub(crate) protected_age_group: bool,
}

impl From<&ScoredApplicant> for PredictionResponse {
    fn from(scored: &ScoredApplicant) -> Self {
        Self {
            loan_approved: scored.result.approved,
            confidence_score: scored.result.confidence,
            fairness_check: FAIRNESS_PROTOCOL_LABEL,
            protected_age_group: scored.age_group.is_protected(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VectorScoreRequest {
    pub(crate) features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VectorScoreResponse {
    pub(crate) loan_approved: bool,
    pub(crate) confidence_score: f64,
    pub(crate) probability_source: ProbabilitySource,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExplainRequest {
    #[serde(flatten)]
    pub(crate) application: LoanApplication,
    #[serde(default)]
    pub(crate) max_display: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExplanationView {
    pub(crate) base_value: f64,
    pub(crate) output_value: f64,
    pub(crate) contributions: Vec<FeatureContribution>,
    pub(crate) waterfall: Waterfall,
}

impl ExplanationView {
    fn new(attribution: &Attribution, max_display: usize) -> Self {
        Self {
            base_value: attribution.base_value,
            output_value: attribution.output_value,
            contributions: attribution.ranked(),
            waterfall: attribution.waterfall(max_display),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExplainResponse {
    #[serde(flatten)]
    pub(crate) prediction: PredictionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation: Option<ExplanationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) explanation_error: Option<String>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/predict", post(predict_endpoint))
        .route("/api/v1/score/vector", post(score_vector_endpoint))
        .route("/api/v1/explain", post(explain_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "model": state.model_name.as_ref() })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn predict_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoanApplication>,
) -> Result<Json<PredictionResponse>, AppError> {
    let scored = state.pipeline.score(payload.into())?;

    info!(
        approved = scored.result.approved,
        confidence = scored.result.confidence,
        protected = scored.age_group.is_protected(),
        "applicant scored"
    );

    Ok(Json(PredictionResponse::from(&scored)))
}

pub(crate) async fn score_vector_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<VectorScoreRequest>,
) -> Result<Json<VectorScoreResponse>, AppError> {
    let features = FeatureVector::from_slice(&payload.features)?;
    let result = state.pipeline.scorer().score(&features)?;

    Ok(Json(VectorScoreResponse {
        loan_approved: result.approved,
        confidence_score: result.confidence,
        probability_source: result.probability_source,
    }))
}

pub(crate) async fn explain_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    let max_display = payload.max_display.unwrap_or(state.max_display).max(2);
    let scored = state.pipeline.score(payload.application.into())?;

    let (explanation, explanation_error) = match state.pipeline.explain(&scored) {
        Ok(attribution) => (Some(ExplanationView::new(&attribution, max_display)), None),
        Err(err) => {
            warn!(error = %err, model = %state.model_name, "explanation unavailable");
            (None, Some(err.to_string()))
        }
    };

    Ok(Json(ExplainResponse {
        prediction: PredictionResponse::from(&scored),
        explanation,
        explanation_error,
    }))
}
