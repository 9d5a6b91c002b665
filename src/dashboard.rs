use crate::page::{self, Explanation, FormValues, Outcome};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use faircredit::error::AppError;
use faircredit::scoring::chart::render_svg;
use faircredit::scoring::{DashboardSelections, LoadedModel, ScoringPipeline};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub(crate) struct DashboardState {
    pipeline: ScoringPipeline,
    metrics: Arc<PrometheusHandle>,
    max_display: usize,
}

impl DashboardState {
    pub(crate) fn new(model: &LoadedModel, metrics: PrometheusHandle, max_display: usize) -> Self {
        Self {
            pipeline: ScoringPipeline::new(model),
            metrics: Arc::new(metrics),
            max_display,
        }
    }
}

/// Raw query string of `GET /`. Every field is optional and parsed by hand so
/// that bad input renders the error panel instead of a bare rejection.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    age: Option<String>,
    credit_amount: Option<String>,
    duration: Option<String>,
    sex: Option<String>,
    housing: Option<String>,
    job: Option<String>,
    standing: Option<String>,
    explain: Option<String>,
}

impl DashboardQuery {
    fn explain_requested(&self) -> bool {
        matches!(
            self.explain.as_deref().map(str::trim),
            Some("true") | Some("1") | Some("on")
        )
    }

    /// Values to echo back into the form, falling back to defaults for
    /// unrecognized labels.
    fn form_values(&self, defaults: &DashboardSelections) -> FormValues {
        FormValues {
            age: raw_or(&self.age, defaults.age),
            credit_amount: raw_or(&self.credit_amount, defaults.credit_amount),
            duration: raw_or(&self.duration, defaults.duration_months),
            sex: label_or(&self.sex, defaults.sex),
            housing: label_or(&self.housing, defaults.housing),
            job: label_or(&self.job, defaults.job),
            standing: label_or(&self.standing, defaults.standing),
        }
    }

    fn selections(&self) -> Result<DashboardSelections, String> {
        let defaults = DashboardSelections::default();
        Ok(DashboardSelections {
            age: number("age", &self.age, defaults.age)?,
            credit_amount: number("credit_amount", &self.credit_amount, defaults.credit_amount)?,
            duration_months: number("duration", &self.duration, defaults.duration_months)?,
            sex: label("sex", &self.sex, defaults.sex)?,
            housing: label("housing", &self.housing, defaults.housing)?,
            job: label("job", &self.job, defaults.job)?,
            standing: label("standing", &self.standing, defaults.standing)?,
        })
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn raw_or<T: ToString>(raw: &Option<String>, default: T) -> String {
    present(raw)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn number<T: FromStr>(field: &str, raw: &Option<String>, default: T) -> Result<T, String> {
    match present(raw) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| format!("{field} must be a number (got '{value}')")),
    }
}

fn parse_label<T: DeserializeOwned>(value: &str) -> Option<T> {
    let deserializer: StrDeserializer<'_, ValueError> = value.into_deserializer();
    T::deserialize(deserializer).ok()
}

fn label<T: DeserializeOwned>(field: &str, raw: &Option<String>, default: T) -> Result<T, String> {
    match present(raw) {
        None => Ok(default),
        Some(value) => {
            parse_label(value).ok_or_else(|| format!("{field} has no option '{value}'"))
        }
    }
}

fn label_or<T: DeserializeOwned>(raw: &Option<String>, default: T) -> T {
    present(raw).and_then(parse_label).unwrap_or(default)
}

pub(crate) fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(healthcheck))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics_endpoint(State(state): State<DashboardState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn dashboard(
    State(state): State<DashboardState>,
    Query(query): Query<DashboardQuery>,
) -> (StatusCode, Html<String>) {
    let form = query.form_values(&DashboardSelections::default());
    let (status, outcome) = evaluate(&state, &query);
    (status, Html(page::render(&form, &outcome)))
}

fn evaluate(state: &DashboardState, query: &DashboardQuery) -> (StatusCode, Outcome) {
    let selections = match query.selections() {
        Ok(selections) => selections,
        Err(message) => return (StatusCode::UNPROCESSABLE_ENTITY, Outcome::Invalid(message)),
    };
    if let Err(err) = selections.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Outcome::Invalid(err.to_string()),
        );
    }

    let scored = match state.pipeline.score(selections.to_attributes()) {
        Ok(scored) => scored,
        Err(err) => {
            let message = err.to_string();
            return (AppError::from(err).status(), Outcome::Invalid(message));
        }
    };

    debug!(
        approved = scored.result.approved,
        confidence = scored.result.confidence,
        standing = selections.standing.label(),
        "dashboard applicant scored"
    );

    let explanation = if query.explain_requested() {
        let chart = state
            .pipeline
            .explain(&scored)
            .map_err(|err| err.to_string())
            .and_then(|attribution| {
                render_svg(&attribution.waterfall(state.max_display)).map_err(|err| err.to_string())
            });
        match chart {
            Ok(svg) => Explanation::Chart(svg),
            Err(message) => {
                warn!(error = %message, "explanation unavailable");
                Explanation::Failed(message)
            }
        }
    } else {
        Explanation::NotRequested
    };

    (
        StatusCode::OK,
        Outcome::Scored {
            scored,
            sex: selections.sex,
            explanation,
        },
    )
}
