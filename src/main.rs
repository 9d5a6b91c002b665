mod dashboard;
mod page;

use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use dashboard::DashboardState;
use faircredit::config::AppConfig;
use faircredit::error::AppError;
use faircredit::scoring::ModelLoader;
use faircredit::telemetry;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "FairCredit Dashboard",
    about = "Interactive audit dashboard for the FairCredit scoring model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the dashboard (default command)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the dashboard
    #[arg(long)]
    host: Option<String>,
    /// Override the configured dashboard port
    #[arg(long)]
    port: Option<u16>,
    /// Model artifact to load instead of APP_MODEL_PATH
    #[arg(long)]
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.dashboard.port = port;
    }
    if let Some(model) = args.model.take() {
        config.model.path = model;
    }

    telemetry::init(&config.telemetry)?;

    let model = ModelLoader::load(&config.model.path)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = DashboardState::new(&model, prometheus_handle, config.explanation.max_display);

    let app = dashboard::router(state).layer(prometheus_layer);

    let addr = SocketAddr::new(config.server.socket_addr()?.ip(), config.dashboard.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        ?config.environment,
        %addr,
        model = %model.name,
        "faircredit dashboard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
