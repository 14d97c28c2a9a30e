//! Metrics middleware for dispatched requests.
//!
//! Wraps each request in a `tracing` span carrying its outcome and duration,
//! and records the `switchyard_requests_total` counter and the
//! `switchyard_request_duration_seconds` histogram through the `metrics`
//! facade.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::request::IncomingRequest;
use crate::service::response::Response;

/// Total requests answered, labelled by `side`, `status` and `outcome`.
pub const REQUESTS_TOTAL: &str = "switchyard_requests_total";

/// Request handling time in seconds, labelled by `side`.
pub const REQUEST_DURATION_SECONDS: &str = "switchyard_request_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments requests with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records request duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<IncomingRequest> for MetricsService<S>
where
    S: Service<IncomingRequest, Response = Response, Error = Infallible> + Send,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: IncomingRequest) -> Self::Future {
        let method = request.method();
        let side = method.side().map_or("unsupported", |side| side.as_str());

        let span = info_span!(
            "request",
            method = %method,
            uri = request.uri(),
            request_id = %request.context().request_id,
            status = tracing::field::Empty,
            outcome = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        let fut = self.inner.call(request);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                if let Ok(response) = &result {
                    let status = response.status().as_u16();
                    let outcome = response.outcome().as_str();

                    #[allow(clippy::cast_possible_truncation)]
                    let duration_ms = elapsed.as_millis() as u64;
                    let span = tracing::Span::current();
                    span.record("status", status);
                    span.record("outcome", outcome);
                    span.record("duration_ms", duration_ms);

                    tracing::info!(
                        side,
                        status,
                        outcome,
                        duration_ms,
                        "request complete"
                    );

                    metrics::counter!(
                        REQUESTS_TOTAL,
                        "side" => side,
                        "status" => status.to_string(),
                        "outcome" => outcome,
                    )
                    .increment(1);
                    metrics::histogram!(REQUEST_DURATION_SECONDS, "side" => side)
                        .record(elapsed.as_secs_f64());
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
