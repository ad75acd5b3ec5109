use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::remittance::{CadenceMode, EscalationThresholds};

const DEFAULT_DASHBOARD_URL: &str = "https://app.example.com/lawyer/dashboard";
const DEFAULT_REFRESH_PAGE_SIZE: usize = 100;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub compliance: ComplianceConfig,
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
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            compliance: ComplianceConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the scheduled remittance compliance run.
#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    /// Shared secret expected as a bearer token on the run trigger. `None` rejects every trigger.
    pub cron_secret: Option<String>,
    pub dashboard_url: String,
    pub cadence_mode: CadenceMode,
    pub refresh_page_size: usize,
    pub thresholds: EscalationThresholds,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            cron_secret: None,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            cadence_mode: CadenceMode::default(),
            refresh_page_size: DEFAULT_REFRESH_PAGE_SIZE,
            thresholds: EscalationThresholds::default(),
        }
    }
}

impl ComplianceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cron_secret = env::var("REMITTANCE_CRON_SECRET")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let dashboard_url =
            env::var("REMITTANCE_DASHBOARD_URL").unwrap_or(defaults.dashboard_url);

        let cadence_mode = match env::var("REMITTANCE_CADENCE_MODE") {
            Ok(raw) => CadenceMode::parse(&raw).ok_or(ConfigError::InvalidCadenceMode(raw))?,
            Err(_) => defaults.cadence_mode,
        };

        let refresh_page_size = match env::var("REMITTANCE_REFRESH_PAGE_SIZE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidPageSize)?,
            Err(_) => defaults.refresh_page_size,
        };

        let thresholds = EscalationThresholds {
            warning_days: days_var("REMITTANCE_WARNING_DAYS", defaults.thresholds.warning_days)?,
            overdue_days: days_var("REMITTANCE_OVERDUE_DAYS", defaults.thresholds.overdue_days)?,
            suspension_days: days_var(
                "REMITTANCE_SUSPENSION_DAYS",
                defaults.thresholds.suspension_days,
            )?,
        };
        if !thresholds.is_ascending() {
            return Err(ConfigError::ThresholdOrder);
        }

        Ok(Self {
            cron_secret,
            dashboard_url,
            cadence_mode,
            refresh_page_size,
            thresholds,
        })
    }
}

fn days_var(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidThreshold { name }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCadenceMode(String),
    InvalidPageSize,
    InvalidThreshold { name: &'static str },
    ThresholdOrder,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCadenceMode(value) => write!(
                f,
                "REMITTANCE_CADENCE_MODE must be 'exact' or 'catch-up' (got '{}')",
                value
            ),
            ConfigError::InvalidPageSize => {
                write!(f, "REMITTANCE_REFRESH_PAGE_SIZE must be a positive integer")
            }
            ConfigError::InvalidThreshold { name } => {
                write!(f, "{} must be a non-negative number of days", name)
            }
            ConfigError::ThresholdOrder => write!(
                f,
                "escalation thresholds must be strictly ascending (warning < overdue < suspension)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
