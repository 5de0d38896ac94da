//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::exporter::SharedExporter;
use crate::exposition::CONTENT_TYPE;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    exporter: SharedExporter,
    landing_page: Arc<str>,
}

/// Create the HTTP router.
pub fn create_router(exporter: SharedExporter, metrics_path: &str) -> Router {
    let state = AppState {
        exporter,
        landing_page: landing_page(metrics_path).into(),
    };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/", get(landing_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render the landing page linking to the metrics path.
fn landing_page(metrics_path: &str) -> String {
    format!(
        "<html>
             <head><title>Pihole Exporter</title></head>
             <body>
             <h1>Pihole Exporter</h1>
             <p><a href='{}'>Metrics</a></p>
             </body>
             </html>",
        metrics_path
    )
}

/// Handler for the metrics endpoint.
///
/// Always answers 200; a failed upstream fetch gives an empty body.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.exporter.scrape().await;

    (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response()
}

/// Handler for the landing page.
async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.landing_page.to_string())
}

/// HTTP server configuration.
pub struct HttpServer {
    exporter: SharedExporter,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(exporter: SharedExporter, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            exporter,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.exporter, &self.metrics_path);
        let addr = listener.local_addr().unwrap_or(self.listen_addr);

        info!(
            addr = %addr,
            path = %self.metrics_path,
            "Listening on"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExporterConfig, PiholeConfig};
    use crate::exporter::Exporter;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn make_exporter() -> SharedExporter {
        // Nothing listens on the released port, so every scrape fails upstream
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ExporterConfig {
            pihole: PiholeConfig {
                endpoint: format!("http://{}", addr),
                auth: String::new(),
            },
            ..Default::default()
        };
        Arc::new(Exporter::new(&config).unwrap())
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint_upstream_down() {
        let router = create_router(make_exporter(), "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics_path() {
        let router = create_router(make_exporter(), "/pihole/metrics");

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/html"));

        let body = body_string(response).await;
        assert!(body.contains("<a href='/pihole/metrics'>Metrics</a>"));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let router = create_router(make_exporter(), "/prometheus/metrics");

        // Custom path should work
        let response = router
            .clone()
            .oneshot(
                Request::get("/prometheus/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Default path should 404
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_methods_use_framework_default() {
        let router = create_router(make_exporter(), "/metrics");

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
