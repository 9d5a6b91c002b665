use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::router;
use axum_prometheus::PrometheusMetricLayer;
use faircredit::config::AppConfig;
use faircredit::error::AppError;
use faircredit::scoring::ModelLoader;
use faircredit::telemetry;
use std::sync::atomic::Ordering;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(model) = args.model.take() {
        config.model.path = model;
    }

    telemetry::init(&config.telemetry)?;

    let model = ModelLoader::load(&config.model.path)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(&model, prometheus_handle, config.explanation.max_display);
    let readiness_flag = app_state.readiness.clone();

    let app = router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model = %model.name,
        "faircredit scoring api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
