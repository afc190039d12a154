use std::env;
use std::fmt;

use crate::entitlements::{AggregateUsagePolicy, EngineConfig};

/// Distinguishes runtime behavior for different stages of the deployment.
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

/// Top-level configuration for the quota engine and its command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidLogFormat { value })?,
            Err(_) => LogFormat::Compact,
        };

        let aggregate_usage = match env::var("QUOTA_AGGREGATE_USAGE") {
            Ok(value) => AggregateUsagePolicy::parse(&value)
                .ok_or(ConfigError::InvalidAggregateUsage { value })?,
            Err(_) => AggregateUsagePolicy::default(),
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level, format },
            engine: EngineConfig { aggregate_usage },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidAggregateUsage { value: String },
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAggregateUsage { value } => write!(
                f,
                "QUOTA_AGGREGATE_USAGE must be per_type_breakdown or reported_total (found '{}')",
                value
            ),
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT must be compact or json (found '{}')", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
