use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models/fair_credit_model.json";
pub const DEFAULT_MAX_DISPLAY: usize = 7;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration shared by the API and the dashboard.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub dashboard: DashboardConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
    pub explanation: ExplanationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("APP_PORT"))?;
        let dashboard_port = env::var("APP_DASHBOARD_PORT")
            .unwrap_or_else(|_| "8501".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("APP_DASHBOARD_PORT"))?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let model_path = env::var("APP_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let max_display = match env::var("APP_EXPLANATION_MAX_DISPLAY") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value >= 2)
                .ok_or(ConfigError::InvalidMaxDisplay(raw))?,
            Err(_) => DEFAULT_MAX_DISPLAY,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            dashboard: DashboardConfig {
                port: dashboard_port,
            },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            model: ModelConfig { path: model_path },
            explanation: ExplanationConfig { max_display },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// The dashboard binds to the same host as the API on its own port.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub port: u16,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Location of the fitted model artifact.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExplanationConfig {
    /// Bars shown in the waterfall chart, including the collapsed remainder.
    pub max_display: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(&'static str),
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidMaxDisplay(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(var) => write!(f, "{var} must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (got '{value}')")
            }
            ConfigError::InvalidMaxDisplay(value) => write!(
                f,
                "APP_EXPLANATION_MAX_DISPLAY must be an integer of at least 2 (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort(_)
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidMaxDisplay(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_DASHBOARD_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_MODEL_PATH",
            "APP_EXPLANATION_MAX_DISPLAY",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.dashboard.port, 8501);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.model.path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.explanation.max_display, 7);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_model_and_explanation_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MODEL_PATH", "/srv/models/credit.json");
        env::set_var("APP_EXPLANATION_MAX_DISPLAY", "10");
        env::set_var("APP_LOG_FORMAT", "json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.model.path, PathBuf::from("/srv/models/credit.json"));
        assert_eq!(config.explanation.max_display, 10);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        reset_env();
    }

    #[test]
    fn rejects_degenerate_max_display() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_EXPLANATION_MAX_DISPLAY", "1");
        let err = AppConfig::load().expect_err("one bar cannot hold the remainder");
        assert!(matches!(err, ConfigError::InvalidMaxDisplay(value) if value == "1"));
        reset_env();
    }

    #[test]
    fn rejects_invalid_dashboard_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DASHBOARD_PORT", "not-a-port");
        let err = AppConfig::load().expect_err("port must be numeric");
        assert_eq!(err.to_string(), "APP_DASHBOARD_PORT must be a valid u16");
        reset_env();
    }
}
