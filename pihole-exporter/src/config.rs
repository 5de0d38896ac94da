//! Configuration for the Pi-hole exporter.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("{0} cannot be empty.")]
    MissingConfiguration(&'static str),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Upstream Pi-hole settings.
    #[serde(default)]
    pub pihole: PiholeConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Metric naming settings.
    #[serde(default)]
    pub exporter: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream Pi-hole connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiholeConfig {
    /// Base URL of the Pi-hole web interface, e.g. `http://pi.hole`.
    #[serde(default)]
    pub endpoint: String,

    /// API token, sent as the `auth` query parameter.
    #[serde(default)]
    pub auth: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to listen on (default: ":9311", i.e. all interfaces).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    ":9311".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

impl WebConfig {
    /// Resolve the listen address. A bare `:port` binds every interface.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        };

        listen
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid listen address: {}", self.listen)))
    }
}

/// Metric naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prefix of every exported metric (default: "pihole").
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "pihole".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Parse the configured level.
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.level.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "Invalid log level '{}'. Valid levels: [trace, debug, info, warn, error]",
                self.level
            ))
        })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Validation(format!(
                "Invalid log format '{}'. Valid formats: [text, json]",
                other
            ))),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    ///
    /// Required fields are not checked here since command line flags may
    /// still fill them in; call [`ExporterConfig::validate`] once the
    /// configuration is final.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pihole.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingConfiguration("Pihole endpoint"));
        }

        self.web.listen_addr()?;

        // Validate path starts with / and does not shadow the landing page
        if !self.web.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }
        if self.web.path == "/" {
            return Err(ConfigError::Validation(
                "Metrics path cannot be /".to_string(),
            ));
        }
        // axum treats these as capture or wildcard syntax
        if let Some(c) = self.web.path.chars().find(|c| matches!(c, ':' | '*' | '{' | '}')) {
            return Err(ConfigError::Validation(format!(
                "Metrics path cannot contain '{}': {}",
                c, self.web.path
            )));
        }

        self.logging.level()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{ pihole: { endpoint: "http://pi.hole" } }"#;
        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.pihole.endpoint, "http://pi.hole");
        assert_eq!(config.pihole.auth, "");
        assert_eq!(config.web.listen, ":9311");
        assert_eq!(config.web.path, "/metrics");
        assert_eq!(config.exporter.namespace, "pihole");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            pihole: {
                endpoint: "http://192.168.1.2",
                auth: "0123456789abcdef",
            },
            web: {
                listen: "127.0.0.1:9312",
                path: "/pihole/metrics",
            },
            exporter: { namespace: "dns" },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.pihole.endpoint, "http://192.168.1.2");
        assert_eq!(config.pihole.auth, "0123456789abcdef");
        assert_eq!(
            config.web.listen_addr().unwrap(),
            "127.0.0.1:9312".parse().unwrap()
        );
        assert_eq!(config.web.path, "/pihole/metrics");
        assert_eq!(config.exporter.namespace, "dns");
        assert_eq!(config.logging.level().unwrap(), Level::DEBUG);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_endpoint() {
        let result = ExporterConfig::parse("{}");
        assert!(matches!(
            result,
            Err(ConfigError::MissingConfiguration("Pihole endpoint"))
        ));

        let err = ExporterConfig::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Pihole endpoint cannot be empty.");
    }

    #[test]
    fn test_bare_port_listens_everywhere() {
        let web = WebConfig::default();
        assert_eq!(web.listen_addr().unwrap(), "0.0.0.0:9311".parse().unwrap());
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            pihole: { endpoint: "http://pi.hole" },
            web: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let json = r#"{
            pihole: { endpoint: "http://pi.hole" },
            web: { path: "no-leading-slash" }
        }"#;
        let result = ExporterConfig::parse(json);
        assert!(result.unwrap_err().to_string().contains("must start with /"));

        let json = r#"{
            pihole: { endpoint: "http://pi.hole" },
            web: { path: "/" }
        }"#;
        assert!(ExporterConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_route_syntax_in_path() {
        for path in ["/:x", "/a*b", "/{id}", "/metrics}"] {
            let json = format!(
                r#"{{ pihole: {{ endpoint: "http://pi.hole" }}, web: {{ path: "{}" }} }}"#,
                path
            );
            let err = ExporterConfig::parse(&json).unwrap_err();
            assert!(
                err.to_string().contains("Metrics path cannot contain"),
                "path {:?} should be rejected, got: {}",
                path,
                err
            );
        }

        let json = r#"{ pihole: { endpoint: "http://pi.hole" }, web: { path: "/pi-hole/metrics_v1" } }"#;
        assert!(ExporterConfig::parse(json).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let json = r#"{
            pihole: { endpoint: "http://pi.hole" },
            logging: { level: "fatal" }
        }"#;
        let result = ExporterConfig::parse(json);
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("logger:stderr".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_load_from_file_defers_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ web: {{ listen: ":9400" }} }}"#).unwrap();

        let mut config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.web.listen, ":9400");
        assert!(config.validate().is_err());

        config.pihole.endpoint = "http://pi.hole".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/pihole-exporter.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
