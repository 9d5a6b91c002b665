use faircredit::scoring::{LoadedModel, ScoringPipeline};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Request-independent state shared by every handler. The model behind
/// `pipeline` is loaded once and never mutated.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) pipeline: ScoringPipeline,
    pub(crate) model_name: Arc<str>,
    pub(crate) max_display: usize,
}

impl AppState {
    pub(crate) fn new(model: &LoadedModel, metrics: PrometheusHandle, max_display: usize) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(metrics),
            pipeline: ScoringPipeline::new(model),
            model_name: Arc::from(model.name.as_str()),
            max_display,
        }
    }
}
