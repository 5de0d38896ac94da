//! HTTP client for the Pi-hole admin API.

use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, trace};

use crate::config::PiholeConfig;
use crate::error::{ExporterError, Result};
use crate::snapshot::Snapshot;

const MEDIA_TYPE: &str = "application/json";

/// User agent sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("pihole-exporter/", env!("CARGO_PKG_VERSION"));

/// Query keys selecting which sections `api.php` returns.
const API_SECTIONS: &[&str] = &[
    "summaryRaw",
    "overTimeData",
    "topItems",
    "recentItems",
    "getQueryTypes",
    "getForwardDestinations",
    "getQuerySources",
];

/// Client for a single Pi-hole instance.
#[derive(Debug, Clone)]
pub struct PiholeClient {
    http: reqwest::Client,
    endpoint: String,
    url: Url,
}

impl PiholeClient {
    /// Create a client for the configured endpoint.
    ///
    /// Only plain `http://` endpoints are accepted. No request is made here.
    pub fn new(config: &PiholeConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim();
        let base = Url::parse(endpoint)
            .map_err(|e| ExporterError::invalid_endpoint(endpoint, e.to_string()))?;

        if base.scheme() != "http" {
            return Err(ExporterError::invalid_endpoint(
                endpoint,
                format!("unsupported scheme '{}', expected 'http'", base.scheme()),
            ));
        }

        let url = api_url(&base, &config.auth);

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExporterError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: base.as_str().trim_end_matches('/').to_string(),
            url,
        })
    }

    /// The normalized base endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The full `api.php` URL queried on every fetch.
    pub fn request_url(&self) -> &Url {
        &self.url
    }

    /// Fetch and decode the current statistics.
    pub async fn fetch(&self) -> Result<Snapshot> {
        debug!(endpoint = %self.endpoint, "Fetching Pi-hole statistics");

        let response = self
            .http
            .get(self.url.clone())
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .header(ACCEPT, MEDIA_TYPE)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::UpstreamStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.unreachable(e))?;
        trace!(bytes = body.len(), "Pi-hole response received");

        Ok(Snapshot::from_slice(&body)?)
    }

    fn unreachable(&self, err: reqwest::Error) -> ExporterError {
        ExporterError::UpstreamUnreachable {
            endpoint: self.endpoint.clone(),
            message: err.to_string(),
        }
    }
}

/// Build `<base>/admin/api.php?summaryRaw&...&auth=<token>`.
fn api_url(base: &Url, auth: &str) -> Url {
    let path = format!("{}/admin/api.php", base.path().trim_end_matches('/'));

    let mut url = base.clone();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    {
        let mut query = url.query_pairs_mut();
        for section in API_SECTIONS {
            query.append_key_only(section);
        }
        query.append_pair("auth", auth);
    }

    url
}
