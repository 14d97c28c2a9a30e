//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use crate::service::config::ServerConfig;
use crate::service::router::RequestRouter;

/// The composed request pipeline returned by [`build_request_pipeline`].
pub type Pipeline = MetricsService<LoadShedService<RequestRouter>>;

/// Build the request pipeline by wrapping the `RequestRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- record timing and outcome, shed requests included
/// 2. `LoadShedLayer` -- answer `503` when overloaded, before any dispatch work
///
/// The returned service implements `tower::Service<IncomingRequest>` and
/// never errors.
#[must_use]
pub fn build_request_pipeline(router: RequestRouter, config: &ServerConfig) -> Pipeline {
    ServiceBuilder::new()
        .layer(MetricsLayer)
        .layer(LoadShedLayer::new(config.max_concurrent_requests))
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
