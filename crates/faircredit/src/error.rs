use crate::config::ConfigError;
use crate::scoring::{
    ApplicantError, ExplanationError, ModelLoadError, PipelineError, ScoringError,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Model(ModelLoadError),
    Applicant(ApplicantError),
    Scoring(ScoringError),
    Explanation(ExplanationError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Scoring(ScoringError::Model(_) | ScoringError::InvalidProbability(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Applicant(_) | AppError::Scoring(_) | AppError::Explanation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Model(err) => write!(f, "model error: {}", err),
            AppError::Applicant(err) => write!(f, "invalid applicant: {}", err),
            AppError::Scoring(err) => write!(f, "scoring error: {}", err),
            AppError::Explanation(err) => write!(f, "explanation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Applicant(err) => Some(err),
            AppError::Scoring(err) => Some(err),
            AppError::Explanation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ModelLoadError> for AppError {
    fn from(value: ModelLoadError) -> Self {
        Self::Model(value)
    }
}

impl From<ApplicantError> for AppError {
    fn from(value: ApplicantError) -> Self {
        Self::Applicant(value)
    }
}

impl From<ScoringError> for AppError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}

impl From<ExplanationError> for AppError {
    fn from(value: ExplanationError) -> Self {
        Self::Explanation(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::Applicant(err) => Self::Applicant(err),
            PipelineError::Scoring(err) => Self::Scoring(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Feature;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn applicant_errors_are_unprocessable() {
        let err = AppError::from(ApplicantError::OutOfRange {
            field: "age",
            value: 12,
            min: 18,
            max: 100,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "invalid applicant: age must be between 18 and 100 (got 12)"
        );
    }

    #[tokio::test]
    async fn scoring_errors_are_unprocessable() {
        let err = AppError::from(PipelineError::Scoring(ScoringError::NonFiniteFeature {
            feature: Feature::CreditAmount,
            value: f64::NAN,
        }));
        assert!(matches!(err, AppError::Scoring(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        let message = body["error"].as_str().expect("string error");
        assert!(message.contains("credit_amount"));
    }

    #[tokio::test]
    async fn classifier_failures_are_internal() {
        let err = AppError::from(ScoringError::InvalidProbability(1.5));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::from(ScoringError::Model("tree walk failed".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "scoring error: model failed to score the applicant: tree walk failed"
        );

        let err = AppError::from(ScoringError::FeatureCount {
            expected: 20,
            actual: 19,
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn model_errors_are_internal() {
        let err = AppError::from(ModelLoadError::NonFiniteParameter("intercept"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(std::error::Error::source(&err).is_some());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
