//! Prometheus exporter for Pi-hole.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pihole_exporter::config::{ConfigError, LogFormat, LoggingConfig};
use pihole_exporter::{Exporter, ExporterConfig, HttpServer};

/// Prometheus exporter for Pi-hole.
#[derive(Parser, Debug)]
#[command(name = "pihole-exporter")]
#[command(about = "Export Pi-hole statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, env = "PIHOLE_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on for web interface and telemetry [default: :9311].
    #[arg(long = "web.listen-address", env = "PIHOLE_EXPORTER_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics].
    #[arg(long = "web.telemetry-path", env = "PIHOLE_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: Option<String>,

    /// Endpoint of Pi-hole, e.g. http://pi.hole.
    #[arg(long = "pihole", env = "PIHOLE_ENDPOINT")]
    endpoint: Option<String>,

    /// Pi-hole API token.
    #[arg(long = "pihole.auth", env = "PIHOLE_AUTH", hide_env_values = true)]
    auth: Option<String>,

    /// Only log messages with the given severity or above (trace, debug, info, warn, error) [default: info].
    #[arg(long = "log.level", env = "PIHOLE_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text, json) [default: text].
    #[arg(long = "log.format", env = "PIHOLE_EXPORTER_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of the file configuration.
    fn apply(self, config: &mut ExporterConfig) -> Result<(), ConfigError> {
        if let Some(listen) = self.listen_address {
            config.web.listen = listen;
        }
        if let Some(path) = self.telemetry_path {
            config.web.path = path;
        }
        if let Some(endpoint) = self.endpoint {
            config.pihole.endpoint = endpoint;
        }
        if let Some(auth) = self.auth {
            config.pihole.auth = auth;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.parse()?;
        }
        Ok(())
    }
}

/// Install the global tracing subscriber.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let log_level = logging.level()?;
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pihole_exporter={}", log_level).parse()?)
        .add_directive(format!("tower_http={}", log_level).parse()?);

    let result = match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set up logging: {}", e))
}

/// Print a message followed by the usage text, then exit.
fn usage_and_exit(message: &str, exit_code: i32) -> ! {
    if !message.is_empty() {
        eprintln!("{}", message);
    }
    eprintln!("{}", Args::command().render_help());
    std::process::exit(exit_code)
}

/// Resolve once Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };
    args.apply(&mut config)?;

    // Initialize logging
    init_logging(&config.logging)?;

    match config.validate() {
        Ok(()) => {}
        Err(e @ ConfigError::MissingConfiguration(_)) => usage_and_exit(&e.to_string(), 1),
        Err(e) => return Err(e.into()),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Pi-hole exporter");

    let exporter = Arc::new(
        Exporter::new(&config).map_err(|e| anyhow::anyhow!("Can't create exporter: {}", e))?,
    );
    let listen_addr = config.web.listen_addr()?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(exporter, listen_addr, config.web.path.clone());
    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut http_task => {
            // Only reachable when the server fails, e.g. the address is taken
            return result.map_err(|e| anyhow::anyhow!("HTTP server task failed: {}", e))?;
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for in-flight scrapes to drain
    if tokio::time::timeout(Duration::from_secs(5), http_task)
        .await
        .is_err()
    {
        warn!("HTTP server did not stop within 5s");
    }

    info!("Exporter stopped");
    Ok(())
}
