mod catalog;

pub use catalog::{
    phrase_set, Backend, BoardQuery, CatalogError, FilterRules, LocationFallback,
    OrganizationCatalog, OrganizationConfig, SourceKind,
};

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the harvester.
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

/// Top-level configuration for one harvest run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub harvest: HarvestConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let output_dir = env::var("HARVEST_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let concurrency: usize = parse_var("HARVEST_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let organization_timeout =
            Duration::from_secs(parse_var("HARVEST_ORG_TIMEOUT_SECS", 300)?);
        let http_timeout = Duration::from_secs(parse_var("HARVEST_HTTP_TIMEOUT_SECS", 15)?);

        let request_delay = match env::var("HARVEST_REQUEST_DELAY_MS") {
            Ok(raw) => Some(Duration::from_millis(parse_value(
                "HARVEST_REQUEST_DELAY_MS",
                &raw,
            )?)),
            Err(_) => None,
        };

        let catalog_path = env::var("HARVEST_CATALOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            harvest: HarvestConfig {
                output_dir,
                concurrency,
                organization_timeout,
                http_timeout,
                request_delay,
                catalog_path,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_var<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => parse_value(variable, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(variable: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber {
            variable,
            value: raw.to_string(),
        })
}

/// Settings controlling where listings land and how hard backends are hit.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub organization_timeout: Duration,
    pub http_timeout: Duration,
    /// Overrides every backend's default inter-request delay when set.
    pub request_delay: Option<Duration>,
    pub catalog_path: Option<PathBuf>,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    ZeroConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a non-negative integer (got '{value}')")
            }
            ConfigError::ZeroConcurrency => {
                write!(f, "HARVEST_CONCURRENCY must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
