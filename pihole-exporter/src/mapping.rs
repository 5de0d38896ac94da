//! Mapping from a Pi-hole [`Snapshot`] to Prometheus samples.
//!
//! All metrics are described once in [`METRICS`]. Both [`MetricMapper::describe`]
//! and [`MetricMapper::render`] walk that table, so the name, type, label and
//! help text of a metric are defined in a single place.

use tracing::warn;

use crate::error::ExporterError;
use crate::snapshot::{DistributionField, RawValue, ScalarField, Snapshot};

/// Prometheus metric type written in the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrometheusType {
    Counter,
    Gauge,
}

impl PrometheusType {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrometheusType::Counter => "counter",
            PrometheusType::Gauge => "gauge",
        }
    }
}

/// Where a metric reads its value(s) from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// Exactly one unlabeled sample.
    Scalar(ScalarField),
    /// One sample per map entry, keyed by `label`.
    Distribution {
        field: DistributionField,
        label: &'static str,
    },
}

/// Static description of one exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDesc {
    /// Name without the namespace prefix.
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: PrometheusType,
    pub source: MetricSource,
}

impl MetricDesc {
    /// Label name carried by this metric, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self.source {
            MetricSource::Scalar(_) => None,
            MetricSource::Distribution { label, .. } => Some(label),
        }
    }
}

const fn scalar(
    name: &'static str,
    help: &'static str,
    metric_type: PrometheusType,
    field: ScalarField,
) -> MetricDesc {
    MetricDesc {
        name,
        help,
        metric_type,
        source: MetricSource::Scalar(field),
    }
}

const fn distribution(
    name: &'static str,
    help: &'static str,
    metric_type: PrometheusType,
    field: DistributionField,
    label: &'static str,
) -> MetricDesc {
    MetricDesc {
        name,
        help,
        metric_type,
        source: MetricSource::Distribution { field, label },
    }
}

/// Every metric this exporter knows about, in exposition order.
pub static METRICS: &[MetricDesc] = &[
    scalar(
        "domains_being_blocked",
        "Domains being blocked.",
        PrometheusType::Counter,
        ScalarField::DomainsBeingBlocked,
    ),
    scalar(
        "dns_queries_today",
        "DNS Queries today.",
        PrometheusType::Counter,
        ScalarField::DnsQueriesToday,
    ),
    scalar(
        "ads_blocked_today",
        "Ads blocked today.",
        PrometheusType::Counter,
        ScalarField::AdsBlockedToday,
    ),
    scalar(
        "ads_percentage_today",
        "Ads percentage today.",
        PrometheusType::Counter,
        ScalarField::AdsPercentageToday,
    ),
    scalar(
        "unique_domains",
        "Unique domains seen today.",
        PrometheusType::Gauge,
        ScalarField::UniqueDomains,
    ),
    scalar(
        "queries_forwarded",
        "DNS queries forwarded upstream today.",
        PrometheusType::Counter,
        ScalarField::QueriesForwarded,
    ),
    scalar(
        "queries_cached",
        "DNS queries answered from cache today.",
        PrometheusType::Counter,
        ScalarField::QueriesCached,
    ),
    scalar(
        "clients_ever_seen",
        "Clients ever seen.",
        PrometheusType::Gauge,
        ScalarField::ClientsEverSeen,
    ),
    scalar(
        "unique_clients",
        "Unique clients seen today.",
        PrometheusType::Gauge,
        ScalarField::UniqueClients,
    ),
    distribution(
        "query_types",
        "DNS Query types.",
        PrometheusType::Counter,
        DistributionField::QueryTypes,
        "type",
    ),
    distribution(
        "top_queries",
        "Top queries.",
        PrometheusType::Counter,
        DistributionField::TopQueries,
        "domain",
    ),
    distribution(
        "top_ads",
        "Top Ads.",
        PrometheusType::Counter,
        DistributionField::TopAds,
        "domain",
    ),
    distribution(
        "top_sources",
        "Top sources.",
        PrometheusType::Counter,
        DistributionField::TopSources,
        "client",
    ),
    distribution(
        "forward_destinations",
        "Share of queries per forward destination.",
        PrometheusType::Gauge,
        DistributionField::ForwardDestinations,
        "destination",
    ),
];

/// One rendered series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Descriptor the sample was produced from.
    pub desc: &'static MetricDesc,
    /// Full metric name, namespace included.
    pub name: String,
    /// Label key-value pairs.
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// Turns snapshots into samples. Holds nothing but the metric namespace.
#[derive(Debug, Clone)]
pub struct MetricMapper {
    namespace: String,
}

impl MetricMapper {
    /// Create a mapper that prefixes every metric with `namespace`.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: sanitize_metric_name(namespace),
        }
    }

    /// The metric namespace in use.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// All metrics this mapper can emit.
    pub fn describe(&self) -> &'static [MetricDesc] {
        METRICS
    }

    /// Full name of a metric, namespace included.
    pub fn full_name(&self, desc: &MetricDesc) -> String {
        build_metric_name(&self.namespace, desc.name)
    }

    /// Render a snapshot into samples, in [`METRICS`] order.
    ///
    /// Malformed mapping entries are logged and skipped.
    pub fn render(&self, snapshot: &Snapshot) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(METRICS.len());

        for desc in METRICS {
            let name = self.full_name(desc);
            match desc.source {
                MetricSource::Scalar(field) => samples.push(Sample {
                    desc,
                    name,
                    labels: Vec::new(),
                    value: snapshot.scalar(field),
                }),
                MetricSource::Distribution { field, label } => {
                    for (key, raw) in snapshot.distribution(field) {
                        match parse_sample_value(desc, key, raw) {
                            Ok(value) => samples.push(Sample {
                                desc,
                                name: name.clone(),
                                labels: vec![(label.to_string(), key.clone())],
                                value,
                            }),
                            Err(e) => warn!(metric = %name, "{}", e),
                        }
                    }
                }
            }
        }

        samples
    }
}

impl Default for MetricMapper {
    fn default() -> Self {
        Self::new("pihole")
    }
}

/// Read one mapping entry as a float.
///
/// Numbers pass through, strings are parsed, anything else is rejected.
pub fn parse_sample_value(
    desc: &MetricDesc,
    key: &str,
    raw: &RawValue,
) -> Result<f64, ExporterError> {
    let failure = |reason: String| ExporterError::MetricParseFailure {
        metric: desc.name,
        label: desc.label().unwrap_or("key"),
        key: key.to_string(),
        reason,
    };

    match raw {
        RawValue::Number(value) => Ok(*value),
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| failure(format!("'{}': {}", text, e))),
        RawValue::Other(value) => Err(failure(format!("unsupported value {}", value))),
    }
}

/// Sanitize a metric name to be Prometheus-compatible.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`. Invalid
/// characters become underscores, runs of underscores collapse, and a leading
/// digit gets an underscore in front of it.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
        last_was_underscore = true;
    }

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == ':' {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    result
}

/// Build a full Prometheus metric name.
///
/// Format: `{namespace}_{name}`, or just `name` for an empty namespace.
pub fn build_metric_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", namespace, name)
    }
}
