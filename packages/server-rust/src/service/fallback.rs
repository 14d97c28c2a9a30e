//! Final fallback responder: the last-resort answer when routing or a
//! handler fails outside the normal outcomes.

use std::sync::Arc;

use switchyard_core::RequestMethod;
use tracing::{error, warn};

use super::request::IncomingRequest;
use super::response::Response;

/// An unexpected failure raised while dispatching to a matched handler.
///
/// The variant tells callers what kind of failure it was; for
/// `Handler`, the wrapped `anyhow::Error` can be downcast to the concrete
/// error type the handler raised.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("handler for {uri} does not accept {method} requests")]
    MethodNotAccepted { method: RequestMethod, uri: String },
    #[error("handler panicked: {message}")]
    Panicked { message: String },
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// Short label used in log fields and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAccepted { .. } => "method_not_accepted",
            Self::Panicked { .. } => "panicked",
            Self::Handler(_) => "handler",
        }
    }
}

/// Produces the terminal response when no route matched or a handler failed.
pub trait RespondsFinally: Send + Sync {
    fn handle_no_matching_route(&self, request: &IncomingRequest) -> Response;

    fn handle_uncaught_failure(&self, failure: &DispatchError, request: &IncomingRequest)
        -> Response;
}

/// Answers `404` for unmatched routes and `500` for failures.
///
/// Failure details go to the log only, never into the response body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFinalResponder;

impl RespondsFinally for DefaultFinalResponder {
    fn handle_no_matching_route(&self, request: &IncomingRequest) -> Response {
        warn!(
            method = %request.method(),
            uri = request.uri(),
            request_id = %request.context().request_id,
            "no route matched"
        );
        Response::not_found()
    }

    fn handle_uncaught_failure(
        &self,
        failure: &DispatchError,
        request: &IncomingRequest,
    ) -> Response {
        error!(
            method = %request.method(),
            uri = request.uri(),
            request_id = %request.context().request_id,
            kind = failure.kind(),
            error = %failure,
            "uncaught failure while handling request"
        );
        Response::internal_error()
    }
}

/// The final responders for both sides.
#[derive(Clone)]
pub struct FinalResponders {
    pub read: Arc<dyn RespondsFinally>,
    pub write: Arc<dyn RespondsFinally>,
}

impl Default for FinalResponders {
    fn default() -> Self {
        Self {
            read: Arc::new(DefaultFinalResponder),
            write: Arc::new(DefaultFinalResponder),
        }
    }
}
