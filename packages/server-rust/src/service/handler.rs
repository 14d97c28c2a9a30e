//! Read and write handler capabilities, and the dispatch sides built on them.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use switchyard_core::{RequestMethod, Side, UriParams};

use super::request::{IncomingRequest, ReadRequest, WriteRequest};
use super::response::Response;

// ---------------------------------------------------------------------------
// Handler traits
// ---------------------------------------------------------------------------

/// Handles query requests (`GET`, `HEAD`).
#[async_trait]
pub trait HandlesReadRequest: Send + Sync {
    /// Whether this handler serves `method`. Defaults to `GET` and `HEAD`.
    fn accepts(&self, method: RequestMethod) -> bool {
        matches!(method, RequestMethod::Get | RequestMethod::Head)
    }

    /// Produces the response for `request`.
    ///
    /// Any error returned here is an uncaught failure and is answered by the
    /// dispatcher's final responder.
    async fn handle(&self, request: &ReadRequest) -> anyhow::Result<Response>;
}

/// Handles command requests (`POST`, `PUT`, `PATCH`, `DELETE`).
#[async_trait]
pub trait HandlesWriteRequest: Send + Sync {
    /// Whether this handler serves `method`. Defaults to `POST` only.
    fn accepts(&self, method: RequestMethod) -> bool {
        method == RequestMethod::Post
    }

    /// Produces the response for `request`.
    async fn handle(&self, request: &WriteRequest) -> anyhow::Result<Response>;
}

/// Shared reference to a read handler, as stored in route tables.
pub type ReadHandler = Arc<dyn HandlesReadRequest>;

/// Shared reference to a write handler, as stored in route tables.
pub type WriteHandler = Arc<dyn HandlesWriteRequest>;

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

struct ReadFn<F>(F);

#[async_trait]
impl<F, Fut> HandlesReadRequest for ReadFn<F>
where
    F: Fn(ReadRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    async fn handle(&self, request: &ReadRequest) -> anyhow::Result<Response> {
        (self.0)(request.clone()).await
    }
}

struct WriteFn<F>(F);

#[async_trait]
impl<F, Fut> HandlesWriteRequest for WriteFn<F>
where
    F: Fn(WriteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    async fn handle(&self, request: &WriteRequest) -> anyhow::Result<Response> {
        (self.0)(request.clone()).await
    }
}

/// Wraps an async closure as a read handler accepting `GET` and `HEAD`.
pub fn read_fn<F, Fut>(f: F) -> ReadHandler
where
    F: Fn(ReadRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    Arc::new(ReadFn(f))
}

/// Wraps an async closure as a write handler accepting `POST`.
pub fn write_fn<F, Fut>(f: F) -> WriteHandler
where
    F: Fn(WriteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    Arc::new(WriteFn(f))
}

// ---------------------------------------------------------------------------
// DispatchSide
// ---------------------------------------------------------------------------

/// Ties a handler type to the request snapshot it receives.
///
/// The dispatcher is generic over this trait, so the read and write
/// dispatchers share one resolve/invoke/fallback implementation.
pub trait DispatchSide: Send + Sync + 'static {
    const SIDE: Side;

    /// Handler reference stored in the route table.
    type Handler: Clone + Send + Sync + 'static;

    /// Snapshot passed to the handler.
    type Request: Send + Sync;

    fn accepts(handler: &Self::Handler, method: RequestMethod) -> bool;

    fn build_request(incoming: &IncomingRequest, params: UriParams) -> Self::Request;

    fn invoke<'a>(
        handler: &'a Self::Handler,
        request: &'a Self::Request,
    ) -> BoxFuture<'a, anyhow::Result<Response>>;
}

/// The query side: `GET` and `HEAD`.
#[derive(Debug)]
pub enum ReadSide {}

impl DispatchSide for ReadSide {
    const SIDE: Side = Side::Read;
    type Handler = ReadHandler;
    type Request = ReadRequest;

    fn accepts(handler: &ReadHandler, method: RequestMethod) -> bool {
        handler.accepts(method)
    }

    fn build_request(incoming: &IncomingRequest, params: UriParams) -> ReadRequest {
        ReadRequest::from_incoming(incoming, params)
    }

    fn invoke<'a>(
        handler: &'a ReadHandler,
        request: &'a ReadRequest,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        handler.handle(request)
    }
}

/// The command side: `POST`, `PUT`, `PATCH` and `DELETE`.
#[derive(Debug)]
pub enum WriteSide {}

impl DispatchSide for WriteSide {
    const SIDE: Side = Side::Write;
    type Handler = WriteHandler;
    type Request = WriteRequest;

    fn accepts(handler: &WriteHandler, method: RequestMethod) -> bool {
        handler.accepts(method)
    }

    fn build_request(incoming: &IncomingRequest, params: UriParams) -> WriteRequest {
        WriteRequest::from_incoming(incoming, params)
    }

    fn invoke<'a>(
        handler: &'a WriteHandler,
        request: &'a WriteRequest,
    ) -> BoxFuture<'a, anyhow::Result<Response>> {
        handler.handle(request)
    }
}
