//! # Request Metrics
//!
//! HTTP-level metrics recorded through the `metrics` facade. Nothing is
//! exported unless the binary installs the Prometheus recorder
//! ([`install_prometheus`]); without a recorder every call is a no-op.
//!
//! | Metric                                | Kind      | Labels                 |
//! |---------------------------------------|-----------|------------------------|
//! | `civic_http_requests_total`           | counter   | method, path, status   |
//! | `civic_http_request_duration_seconds` | histogram | method, path           |
//! | `civic_references_allocated_total`    | counter   | kind                   |
//! | `civic_transitions_total`             | counter   | entity, to             |

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the global Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Label for the request path: the matched route template when available,
/// so ids do not explode label cardinality.
fn path_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Middleware that records a counter and latency histogram per request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = path_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(
        "civic_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "civic_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
