//! Scrape orchestration: fetch, map, encode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::client::PiholeClient;
use crate::config::ExporterConfig;
use crate::error::Result;
use crate::exposition;
use crate::mapping::{MetricDesc, MetricMapper, Sample};

/// Collects Pi-hole statistics on demand and exposes them as samples.
///
/// Holds no per-scrape state; concurrent scrapes each hit Pi-hole.
#[derive(Debug, Clone)]
pub struct Exporter {
    client: PiholeClient,
    mapper: MetricMapper,
}

/// Create a shareable exporter handle.
pub type SharedExporter = Arc<Exporter>;

impl Exporter {
    /// Build the exporter from the final configuration.
    pub fn new(config: &ExporterConfig) -> Result<Self> {
        info!(endpoint = %config.pihole.endpoint, "Setup Pi-hole exporter");

        Ok(Self {
            client: PiholeClient::new(&config.pihole)?,
            mapper: MetricMapper::new(&config.exporter.namespace),
        })
    }

    /// All metrics ever exported.
    pub fn describe(&self) -> &'static [MetricDesc] {
        self.mapper.describe()
    }

    /// Run one scrape cycle.
    ///
    /// Upstream failures are logged and yield no samples.
    pub async fn collect(&self) -> Vec<Sample> {
        let start = Instant::now();

        let snapshot = match self.client.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(endpoint = %self.client.endpoint(), "Pi-hole error: {}", e);
                return Vec::new();
            }
        };
        debug!(status = %snapshot.status, "Pi-hole metrics: {:?}", snapshot);

        let samples = self.mapper.render(&snapshot);
        debug!(
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scrape complete"
        );
        samples
    }

    /// Run one scrape cycle and encode it as Prometheus text.
    pub async fn scrape(&self) -> String {
        exposition::encode(&self.collect().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PiholeConfig;
    use crate::error::ExporterError;

    fn config(endpoint: &str) -> ExporterConfig {
        ExporterConfig {
            pihole: PiholeConfig {
                endpoint: endpoint.to_string(),
                auth: String::new(),
            },
            ..Default::default()
        }
    }

    fn unreachable_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = Exporter::new(&config("https://pi.hole"));
        assert!(matches!(result, Err(ExporterError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_describe() {
        let exporter = Exporter::new(&config("http://pi.hole")).unwrap();
        assert_eq!(exporter.describe().len(), 14);
        assert_eq!(exporter.describe()[0].name, "domains_being_blocked");
    }

    #[tokio::test]
    async fn test_collect_upstream_down_yields_nothing() {
        let exporter = Exporter::new(&config(&unreachable_endpoint())).unwrap();

        assert!(exporter.collect().await.is_empty());
        assert_eq!(exporter.scrape().await, "");
    }
}
