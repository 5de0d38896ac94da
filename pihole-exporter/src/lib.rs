//! Prometheus metrics exporter for Pi-hole.
//!
//! Every scrape of the metrics endpoint triggers one request to the Pi-hole
//! admin API; the JSON answer is mapped onto a fixed set of metrics and
//! rendered in the Prometheus text format. Nothing is cached between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Pi-hole api.php │<────│    Exporter     │<────│   HTTP Server   │
//! │  (PiholeClient) │────>│ (MetricMapper)  │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! pihole-exporter --pihole http://pi.hole --pihole.auth "$PIHOLE_TOKEN"
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod client;
pub mod config;
pub mod error;
pub mod exporter;
pub mod exposition;
pub mod http;
pub mod mapping;
pub mod snapshot;

pub use client::PiholeClient;
pub use config::ExporterConfig;
pub use error::{ExporterError, Result};
pub use exporter::{Exporter, SharedExporter};
pub use http::HttpServer;
pub use mapping::{MetricDesc, MetricMapper, Sample};
pub use snapshot::Snapshot;
