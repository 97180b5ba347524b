use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::scoring::{LevelSetPolicy, ScoringPolicy, TimestampPolicy};

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
    pub scoring: ScoringSettings,
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
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let namespace = env::var("GROWTH_NAMESPACE").unwrap_or_else(|_| "growth".to_string());
        if namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        let timestamps = match env::var("GROWTH_TIMESTAMP_POLICY") {
            Ok(raw) => parse_timestamp_policy(&raw)?,
            Err(_) => TimestampPolicy::default(),
        };
        let level_set = match env::var("GROWTH_LEVEL_SET") {
            Ok(raw) => parse_level_set(&raw)?,
            Err(_) => LevelSetPolicy::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            scoring: ScoringSettings {
                namespace: namespace.trim().to_string(),
                policy: ScoringPolicy {
                    timestamps,
                    level_set,
                },
            },
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Output layout for the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Program namespace and policy dials handed to the scoring engine.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub namespace: String,
    pub policy: ScoringPolicy,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            namespace: "growth".to_string(),
            policy: ScoringPolicy::default(),
        }
    }
}

fn parse_timestamp_policy(raw: &str) -> Result<TimestampPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "authoritative" => Ok(TimestampPolicy::Authoritative),
        "advisory" | "clock" => Ok(TimestampPolicy::Advisory),
        other => Err(ConfigError::InvalidTimestampPolicy(other.to_string())),
    }
}

fn parse_level_set(raw: &str) -> Result<LevelSetPolicy, ConfigError> {
    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() || value == "primary" {
        return Ok(LevelSetPolicy::Primary);
    }

    let index = value
        .strip_prefix("index:")
        .and_then(|index| index.trim().parse::<usize>().ok());

    match index {
        Some(index) => Ok(LevelSetPolicy::Indexed(index)),
        None => Err(ConfigError::InvalidLevelSet(value)),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    EmptyNamespace,
    InvalidTimestampPolicy(String),
    InvalidLevelSet(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::EmptyNamespace => write!(f, "GROWTH_NAMESPACE must not be empty"),
            ConfigError::InvalidTimestampPolicy(value) => write!(
                f,
                "GROWTH_TIMESTAMP_POLICY must be 'authoritative' or 'advisory' (found '{value}')"
            ),
            ConfigError::InvalidLevelSet(value) => write!(
                f,
                "GROWTH_LEVEL_SET must be 'primary' or 'index:<n>' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::EmptyNamespace
            | ConfigError::InvalidTimestampPolicy(_)
            | ConfigError::InvalidLevelSet(_) => None,
        }
    }
}
