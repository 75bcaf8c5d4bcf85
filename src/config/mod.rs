//! Configuration module
//!
//! Gateway settings are read from the environment once at startup and then
//! shared read-only with every request handler.

mod env;

pub use env::{get_env, get_env_or, EnvBuilder, EnvSource, ProcessEnv};

use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;

use crate::utils::LogLevel;

/// Default port of the log gateway
pub const DEFAULT_LOG_GATEWAY_PORT: u16 = 8080;

/// Default port of the metrics gateway
pub const DEFAULT_METRICS_GATEWAY_PORT: u16 = 8083;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required (e.g. {1})")]
    Missing(&'static str, &'static str),

    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

fn port(source: &impl EnvSource, default: u16) -> Result<u16, ConfigError> {
    match get_env(source, "PORT") {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value,
        }),
        None => Ok(default),
    }
}

fn log_level(source: &impl EnvSource) -> LogLevel {
    get_env(source, "LOG_LEVEL")
        .and_then(|v| LogLevel::from_str(&v))
        .unwrap_or(LogLevel::Info)
}

/// Log gateway configuration
#[derive(Clone, Debug)]
pub struct LogGatewayConfig {
    /// Listen port from PORT
    pub port: u16,

    /// Log level from LOG_LEVEL
    pub log_level: LogLevel,
}

impl LogGatewayConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            port: port(source, DEFAULT_LOG_GATEWAY_PORT)?,
            log_level: log_level(source),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Metrics gateway configuration
#[derive(Clone, Debug)]
pub struct MetricsGatewayConfig {
    /// Listen port from PORT
    pub port: u16,

    /// Prometheus base URL from PROMETHEUS_URL, without trailing slash
    pub prometheus_url: String,

    /// Allowed CORS origin from CORS_ALLOWED_ORIGIN
    pub allowed_origin: String,

    /// Log level from LOG_LEVEL
    pub log_level: LogLevel,
}

impl MetricsGatewayConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let prometheus_url = get_env(source, "PROMETHEUS_URL").ok_or(ConfigError::Missing(
            "PROMETHEUS_URL",
            "http://prometheus.monitoring.svc.cluster.local:9090",
        ))?;

        reqwest::Url::parse(&prometheus_url).map_err(|_| ConfigError::Invalid {
            name: "PROMETHEUS_URL",
            value: prometheus_url.clone(),
        })?;

        Ok(Self {
            port: port(source, DEFAULT_METRICS_GATEWAY_PORT)?,
            prometheus_url: prometheus_url.trim_end_matches('/').to_string(),
            allowed_origin: get_env_or(source, "CORS_ALLOWED_ORIGIN", "*"),
            log_level: log_level(source),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_gateway_defaults() {
        let config = LogGatewayConfig::from_source(&EnvBuilder::new().build()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.listen_addr().port(), 8080);
    }

    #[test]
    fn test_log_gateway_port_override() {
        let env = EnvBuilder::new().var("PORT", "9999").var("LOG_LEVEL", "debug").build();
        let config = LogGatewayConfig::from_source(&env).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_port() {
        let env = EnvBuilder::new().var("PORT", "http").build();
        let err = LogGatewayConfig::from_source(&env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "http".to_string()
            }
        );
    }

    #[test]
    fn test_metrics_gateway_requires_prometheus_url() {
        let err = MetricsGatewayConfig::from_source(&EnvBuilder::new().build()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PROMETHEUS_URL", _)));
    }

    #[test]
    fn test_metrics_gateway_config() {
        let env = EnvBuilder::new()
            .var("PROMETHEUS_URL", "http://prometheus:9090/")
            .build();
        let config = MetricsGatewayConfig::from_source(&env).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.prometheus_url, "http://prometheus:9090");
        assert_eq!(config.allowed_origin, "*");

        let env = EnvBuilder::new()
            .var("PROMETHEUS_URL", "http://prometheus:9090")
            .var("CORS_ALLOWED_ORIGIN", "https://shop.example.com")
            .build();
        let config = MetricsGatewayConfig::from_source(&env).unwrap();
        assert_eq!(config.allowed_origin, "https://shop.example.com");
    }

    #[test]
    fn test_metrics_gateway_rejects_bad_url() {
        let env = EnvBuilder::new().var("PROMETHEUS_URL", "not a url").build();
        assert!(matches!(
            MetricsGatewayConfig::from_source(&env),
            Err(ConfigError::Invalid { name: "PROMETHEUS_URL", .. })
        ));
    }
}
