//! Request routing: splits requests between the read and write dispatchers
//! by method and answers `OPTIONS` from both route tables.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use switchyard_core::{RequestMethod, RouteTable, Side};
use tower::Service;
use tracing::debug;

use super::dispatcher::{ReadDispatcher, WriteDispatcher};
use super::fallback::{FinalResponders, RespondsFinally};
use super::handler::{ReadHandler, WriteHandler};
use super::request::IncomingRequest;
use super::response::Response;

// ---------------------------------------------------------------------------
// RequestRouter
// ---------------------------------------------------------------------------

/// Entry point for every request.
///
/// - `GET`/`HEAD` go to the read dispatcher.
/// - `POST`/`PUT`/`PATCH`/`DELETE` go to the write dispatcher.
/// - `OPTIONS` is answered with the methods accepted by every handler whose
///   route matches the URI, from both tables; with none, the read side's
///   no-route path answers.
/// - Any other method is answered by the write side's no-route path.
#[derive(Clone)]
pub struct RequestRouter {
    read: ReadDispatcher,
    write: WriteDispatcher,
}

impl RequestRouter {
    #[must_use]
    pub fn new(read: ReadDispatcher, write: WriteDispatcher) -> Self {
        Self { read, write }
    }

    #[must_use]
    pub fn builder() -> RequestRouterBuilder {
        RequestRouterBuilder::default()
    }

    #[must_use]
    pub fn read(&self) -> &ReadDispatcher {
        &self.read
    }

    #[must_use]
    pub fn write(&self) -> &WriteDispatcher {
        &self.write
    }

    /// Methods served for `uri` across both sides, in canonical order.
    #[must_use]
    pub fn allowed_methods(&self, uri: &str) -> BTreeSet<RequestMethod> {
        let mut allowed = self.read.allowed_methods(uri);
        allowed.extend(self.write.allowed_methods(uri));
        allowed
    }

    /// Produces the terminal response for `incoming`.
    pub async fn handle(&self, incoming: IncomingRequest) -> Response {
        match incoming.method().side() {
            Some(Side::Read) => self.read.dispatch(incoming).await,
            Some(Side::Write) => self.write.dispatch(incoming).await,
            Some(Side::Options) => self.options(&incoming),
            None => {
                debug!(method = %incoming.method(), "unsupported request method");
                self.write.respond_no_route(&incoming)
            }
        }
    }

    fn options(&self, incoming: &IncomingRequest) -> Response {
        let allowed = self.allowed_methods(incoming.uri());
        if allowed.is_empty() {
            return self.read.respond_no_route(incoming);
        }
        Response::options(&allowed)
    }
}

impl Service<IncomingRequest> for RequestRouter {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: IncomingRequest) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { Ok(router.handle(request).await) })
    }
}

// ---------------------------------------------------------------------------
// RequestRouterBuilder
// ---------------------------------------------------------------------------

/// Collects route tables and final responders for a [`RequestRouter`].
///
/// Unset tables are empty; unset responders are
/// [`DefaultFinalResponder`](super::fallback::DefaultFinalResponder).
#[derive(Default)]
pub struct RequestRouterBuilder {
    read_routes: RouteTable<ReadHandler>,
    write_routes: RouteTable<WriteHandler>,
    responders: FinalResponders,
}

impl RequestRouterBuilder {
    #[must_use]
    pub fn read_routes(mut self, routes: RouteTable<ReadHandler>) -> Self {
        self.read_routes = routes;
        self
    }

    #[must_use]
    pub fn write_routes(mut self, routes: RouteTable<WriteHandler>) -> Self {
        self.write_routes = routes;
        self
    }

    #[must_use]
    pub fn final_read_responder(mut self, responder: Arc<dyn RespondsFinally>) -> Self {
        self.responders.read = responder;
        self
    }

    #[must_use]
    pub fn final_write_responder(mut self, responder: Arc<dyn RespondsFinally>) -> Self {
        self.responders.write = responder;
        self
    }

    #[must_use]
    pub fn final_responders(mut self, responders: FinalResponders) -> Self {
        self.responders = responders;
        self
    }

    #[must_use]
    pub fn build(self) -> RequestRouter {
        RequestRouter::new(
            ReadDispatcher::new(self.read_routes, self.responders.read),
            WriteDispatcher::new(self.write_routes, self.responders.write),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
