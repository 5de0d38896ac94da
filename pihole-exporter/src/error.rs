//! Error types for the Pi-hole exporter.

use thiserror::Error;

/// Result type alias using [`ExporterError`].
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Errors raised while talking to Pi-hole or turning its answer into metrics.
///
/// [`ExporterError::InvalidEndpoint`] and [`ExporterError::ClientBuild`] only
/// surface at startup. Everything else is handled inside a single scrape.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// The configured endpoint is not a valid `http://` URL.
    #[error("Invalid Pi-hole address '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The underlying HTTP client could not be created.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The request never produced a readable response.
    #[error("Pi-hole unreachable at {endpoint}: {message}")]
    UpstreamUnreachable { endpoint: String, message: String },

    /// Pi-hole answered with a non-success status.
    #[error("Pi-hole at {endpoint} returned HTTP {status}")]
    UpstreamStatus { endpoint: String, status: u16 },

    /// The response body is not the expected JSON document.
    #[error("Failed to decode Pi-hole response: {0}")]
    DecodeFailure(#[from] serde_json::Error),

    /// A single mapping entry could not be read as a number.
    #[error("Can't store metric {metric}{{{label}=\"{key}\"}}: {reason}")]
    MetricParseFailure {
        metric: &'static str,
        label: &'static str,
        key: String,
        reason: String,
    },
}

impl ExporterError {
    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint_message() {
        let err = ExporterError::invalid_endpoint("https://pi.hole", "scheme must be http");
        assert_eq!(
            err.to_string(),
            "Invalid Pi-hole address 'https://pi.hole': scheme must be http"
        );
        assert!(matches!(err, ExporterError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_metric_parse_failure_message() {
        let err = ExporterError::MetricParseFailure {
            metric: "top_ads",
            label: "domain",
            key: "ads.example.com".to_string(),
            reason: "invalid float literal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Can't store metric top_ads{domain=\"ads.example.com\"}: invalid float literal"
        );
    }

    #[test]
    fn test_decode_failure_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ExporterError::from(json_err);
        assert!(matches!(err, ExporterError::DecodeFailure(_)));
        assert!(err.to_string().starts_with("Failed to decode Pi-hole response:"));
    }
}
