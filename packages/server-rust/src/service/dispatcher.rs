//! Dispatcher: resolves one request against a route table and guarantees
//! exactly one terminal response.

use std::any::Any;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use switchyard_core::{RequestMethod, RouteMatch, RouteTable};
use tower::Service;
use tracing::debug;

use super::fallback::{DispatchError, RespondsFinally};
use super::handler::{DispatchSide, ReadSide, WriteSide};
use super::request::IncomingRequest;
use super::response::{Outcome, Response};

/// Dispatcher for queries.
pub type ReadDispatcher = Dispatcher<ReadSide>;

/// Dispatcher for commands.
pub type WriteDispatcher = Dispatcher<WriteSide>;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owns one side's route table and final responder.
///
/// For each request it:
/// 1. resolves the method and URI against the table: the first route whose
///    pattern matches and whose handler accepts the method wins;
/// 2. on a match, merges the captured URI parameters over the request's own
///    parameters and invokes the handler;
/// 3. without a match, answers through the final responder's no-route path;
/// 4. when the handler errors or panics, or when routes match the URI but
///    none serves the method, answers through the final responder's
///    uncaught-failure path.
///
/// Exactly one of the handler or the final responder produces the response.
/// Cloning is cheap: the table and responder are shared via `Arc`.
pub struct Dispatcher<S: DispatchSide> {
    routes: Arc<RouteTable<S::Handler>>,
    final_responder: Arc<dyn RespondsFinally>,
}

impl<S: DispatchSide> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            final_responder: Arc::clone(&self.final_responder),
        }
    }
}

impl<S: DispatchSide> Dispatcher<S> {
    #[must_use]
    pub fn new(routes: RouteTable<S::Handler>, final_responder: Arc<dyn RespondsFinally>) -> Self {
        Self {
            routes: Arc::new(routes),
            final_responder,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable<S::Handler> {
        &self.routes
    }

    /// Methods served by any handler whose route matches `uri`.
    #[must_use]
    pub fn allowed_methods(&self, uri: &str) -> BTreeSet<RequestMethod> {
        let handlers = self.routes.handlers_for_uri(uri);
        RequestMethod::ALL
            .into_iter()
            .filter(|method| handlers.iter().any(|h| S::accepts(h, *method)))
            .collect()
    }

    /// Produces the terminal response for `incoming`.
    pub async fn dispatch(&self, incoming: IncomingRequest) -> Response {
        let side = S::SIDE.as_str();
        let method = incoming.method();
        let accepts = |handler: &S::Handler| S::accepts(handler, method);
        let Some(RouteMatch { handler, params }) = self
            .routes
            .resolve_accepting(incoming.destination(), &accepts)
        else {
            if self.routes.resolve(incoming.destination()).is_some() {
                debug!(side, destination = %incoming.destination(), "no route accepts method");
                let failure = DispatchError::MethodNotAccepted {
                    method,
                    uri: incoming.uri().to_string(),
                };
                return self.respond_failure(&failure, &incoming);
            }
            debug!(side, destination = %incoming.destination(), "no route matched");
            return self.respond_no_route(&incoming);
        };

        debug!(
            side,
            destination = %incoming.destination(),
            params = params.len(),
            "route matched"
        );

        let request = S::build_request(&incoming, params);
        let result = AssertUnwindSafe(S::invoke(&handler, &request))
            .catch_unwind()
            .await;

        let mut response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => self.respond_failure(&DispatchError::Handler(err), &incoming),
            Err(panic) => {
                let failure = DispatchError::Panicked {
                    message: panic_message(panic.as_ref()),
                };
                self.respond_failure(&failure, &incoming)
            }
        };

        if method == RequestMethod::Head {
            response.strip_body();
        }
        response
    }

    pub(crate) fn respond_no_route(&self, incoming: &IncomingRequest) -> Response {
        self.final_responder
            .handle_no_matching_route(incoming)
            .with_outcome(Outcome::NoRoute)
    }

    fn respond_failure(&self, failure: &DispatchError, incoming: &IncomingRequest) -> Response {
        self.final_responder
            .handle_uncaught_failure(failure, incoming)
            .with_outcome(Outcome::Failed)
    }
}

impl<S: DispatchSide> Service<IncomingRequest> for Dispatcher<S> {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: IncomingRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(request).await) })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use http::StatusCode;
    use parking_lot::Mutex;
    use serde_json::json;
    use switchyard_core::{Pattern, RequestData, Route, RouteGroup};
    use tower::ServiceExt;

    use super::*;
    use crate::service::handler::{
        read_fn, write_fn, HandlesWriteRequest, ReadHandler, WriteHandler,
    };
    use crate::service::request::WriteRequest;

    /// Final responder that records every call.
    #[derive(Default)]
    struct RecordingResponder {
        no_route: AtomicUsize,
        failures: Mutex<Vec<String>>,
    }

    impl RespondsFinally for RecordingResponder {
        fn handle_no_matching_route(&self, _request: &IncomingRequest) -> Response {
            self.no_route.fetch_add(1, Ordering::SeqCst);
            Response::text(StatusCode::NOT_FOUND, "fine")
        }

        fn handle_uncaught_failure(
            &self,
            failure: &DispatchError,
            _request: &IncomingRequest,
        ) -> Response {
            self.failures.lock().push(failure.kind().to_string());
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
        }
    }

    /// Handler that echoes its merged parameters as JSON.
    fn echo_params() -> WriteHandler {
        write_fn(|request: WriteRequest| async move {
            Ok::<_, anyhow::Error>(Response::ok_json(&serde_json::to_value(request.input())?))
        })
    }

    fn counting_read_handler(calls: Arc<AtomicUsize>) -> ReadHandler {
        read_fn(move |_request| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(Response::ok_json(&json!({"ok": true})))
            }
        })
    }

    fn body_json(resp: &Response) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn uri_params_overwrite_body_params() {
        let cases = [
            ("unit", "tested", json!({"unit": "tested", "test": "unit"})),
            ("test", "units", json!({"unit": "test", "test": "units"})),
        ];

        for (key, value, expected) in cases {
            let pattern = Pattern::regex(
                &format!("/domain/test_request_param/{key}/({value})"),
                [key],
            )
            .unwrap();
            let routes = RouteTable::new().route(Route::new(pattern, echo_params()));
            let dispatcher = WriteDispatcher::new(routes, Arc::new(RecordingResponder::default()));

            let body: RequestData = [("unit", "test"), ("test", "unit")].into_iter().collect();
            let incoming = IncomingRequest::new(
                RequestMethod::Post,
                format!("/domain/test_request_param/{key}/{value}"),
            )
            .with_input(body);

            let resp = dispatcher.dispatch(incoming).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(body_json(&resp), expected);
        }
    }

    #[tokio::test]
    async fn uri_param_replaces_nested_body_param() {
        let pattern = Pattern::regex("/domain/test_request_param/unit/(units)", ["unit"]).unwrap();
        let routes = RouteTable::new().route(Route::new(pattern, echo_params()));
        let dispatcher = WriteDispatcher::new(routes, Arc::new(RecordingResponder::default()));

        let body = RequestData::from_pairs([("unit[test]", "unit")]);
        let incoming = IncomingRequest::new(RequestMethod::Post, "/domain/test_request_param/unit/units")
            .with_input(body);

        let resp = dispatcher.dispatch(incoming).await;
        assert_eq!(body_json(&resp), json!({"unit": "units"}));
    }

    #[tokio::test]
    async fn empty_table_uses_no_route_path_once() {
        let responder = Arc::new(RecordingResponder::default());
        let dispatcher = WriteDispatcher::new(RouteTable::new(), Arc::clone(&responder) as Arc<dyn RespondsFinally>);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Post, "/test"))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.body().as_ref(), b"fine");
        assert_eq!(resp.outcome(), Outcome::NoRoute);
        assert_eq!(responder.no_route.load(Ordering::SeqCst), 1);
        assert!(responder.failures.lock().is_empty());
    }

    #[tokio::test]
    async fn handler_error_uses_uncaught_failure_path_once() {
        #[derive(Debug, thiserror::Error)]
        #[error("unit test failure")]
        struct UnitTestFailure;

        let responder = Arc::new(RecordingResponder::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let handler_calls = Arc::clone(&calls);
        let handler = write_fn(move |_request| {
            let calls = Arc::clone(&handler_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Response, _>(anyhow::Error::new(UnitTestFailure))
            }
        });
        let routes = RouteTable::new().route(Route::new(Pattern::literal("/test"), handler));
        let dispatcher = WriteDispatcher::new(routes, Arc::clone(&responder) as Arc<dyn RespondsFinally>);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Post, "/test"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body().as_ref(), b"unit test failure");
        assert_eq!(resp.outcome(), Outcome::Failed);
        assert_eq!(*responder.failures.lock(), vec!["handler".to_string()]);
        assert_eq!(responder.no_route.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_panic_is_contained() {
        let responder = Arc::new(RecordingResponder::default());
        let handler = read_fn(|_request| async {
            if true {
                panic!("boom");
            }
            Ok::<_, anyhow::Error>(Response::no_content())
        });
        let routes = RouteTable::new().route(Route::new(Pattern::literal("/panic"), handler));
        let dispatcher = ReadDispatcher::new(routes, Arc::clone(&responder) as Arc<dyn RespondsFinally>);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Get, "/panic"))
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body().as_ref(), b"handler panicked: boom");
        assert_eq!(*responder.failures.lock(), vec!["panicked".to_string()]);
    }

    #[tokio::test]
    async fn method_not_accepted_is_an_uncaught_failure() {
        let responder = Arc::new(RecordingResponder::default());
        let routes = RouteTable::new().route(Route::new(Pattern::literal("/test"), echo_params()));
        let dispatcher = WriteDispatcher::new(routes, Arc::clone(&responder) as Arc<dyn RespondsFinally>);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Delete, "/test"))
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            *responder.failures.lock(),
            vec!["method_not_accepted".to_string()]
        );
    }

    #[tokio::test]
    async fn later_route_serves_method_rejected_by_earlier_one() {
        struct DeleteOnly;

        #[async_trait]
        impl HandlesWriteRequest for DeleteOnly {
            fn accepts(&self, method: RequestMethod) -> bool {
                method == RequestMethod::Delete
            }

            async fn handle(&self, _request: &WriteRequest) -> anyhow::Result<Response> {
                Ok(Response::no_content())
            }
        }

        let responder = Arc::new(RecordingResponder::default());
        let routes = RouteTable::new()
            .route(Route::new(Pattern::literal("/a"), echo_params()))
            .route(Route::new(
                Pattern::literal("/a"),
                Arc::new(DeleteOnly) as WriteHandler,
            ));
        let dispatcher = WriteDispatcher::new(routes, Arc::clone(&responder) as Arc<dyn RespondsFinally>);

        let allowed: Vec<_> = dispatcher.allowed_methods("/a").into_iter().collect();
        assert_eq!(allowed, vec![RequestMethod::Post, RequestMethod::Delete]);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Delete, "/a"))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Post, "/a"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(responder.failures.lock().is_empty());
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let routes = RouteTable::new()
            .route(Route::new(
                Pattern::named_regex(".*").unwrap(),
                counting_read_handler(Arc::clone(&first)),
            ))
            .route(Route::new(
                Pattern::named_regex(".*").unwrap(),
                counting_read_handler(Arc::clone(&second)),
            ));
        let dispatcher = ReadDispatcher::new(routes, Arc::new(RecordingResponder::default()));

        dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Get, "/anything"))
            .await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn route_groups_resolve_through_dispatcher() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = RouteGroup::new(Pattern::named_regex("/reports.*").unwrap())
            .add_route(Route::new(
                Pattern::named_regex(r"/reports/(?P<year>\d{4})").unwrap(),
                counting_read_handler(Arc::clone(&calls)),
            ));
        let responder = Arc::new(RecordingResponder::default());
        let dispatcher = ReadDispatcher::new(
            RouteTable::new().route(group),
            Arc::clone(&responder) as Arc<dyn RespondsFinally>,
        );

        let ok = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Get, "/reports/2024"))
            .await;
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Get, "/reports/latest"))
            .await;
        assert_eq!(missing.outcome(), Outcome::NoRoute);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(responder.no_route.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn head_request_has_no_body() {
        let routes = RouteTable::new().route(Route::new(
            Pattern::literal("/status"),
            counting_read_handler(Arc::new(AtomicUsize::new(0))),
        ));
        let dispatcher = ReadDispatcher::new(routes, Arc::new(RecordingResponder::default()));

        let resp = dispatcher
            .dispatch(IncomingRequest::new(RequestMethod::Head, "/status"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.body().is_empty());
    }

    #[tokio::test]
    async fn allowed_methods_follow_handler_acceptance() {
        struct AnyWrite;

        #[async_trait]
        impl HandlesWriteRequest for AnyWrite {
            fn accepts(&self, method: RequestMethod) -> bool {
                matches!(method, RequestMethod::Put | RequestMethod::Delete)
            }

            async fn handle(&self, _request: &WriteRequest) -> anyhow::Result<Response> {
                Ok(Response::no_content())
            }
        }

        let routes = RouteTable::new()
            .route(Route::new(Pattern::literal("/a"), echo_params()))
            .route(Route::new(
                Pattern::named_regex("/.*").unwrap(),
                Arc::new(AnyWrite) as WriteHandler,
            ));
        let dispatcher = WriteDispatcher::new(routes, Arc::new(RecordingResponder::default()));

        let allowed: Vec<_> = dispatcher.allowed_methods("/a").into_iter().collect();
        assert_eq!(
            allowed,
            vec![RequestMethod::Post, RequestMethod::Put, RequestMethod::Delete]
        );
        let allowed: Vec<_> = dispatcher.allowed_methods("/b").into_iter().collect();
        assert_eq!(allowed, vec![RequestMethod::Put, RequestMethod::Delete]);
    }

    #[tokio::test]
    async fn dispatcher_is_a_tower_service() {
        let routes = RouteTable::new().route(Route::new(
            Pattern::literal("/svc"),
            counting_read_handler(Arc::new(AtomicUsize::new(0))),
        ));
        let dispatcher = ReadDispatcher::new(routes, Arc::new(RecordingResponder::default()));

        let resp = dispatcher
            .oneshot(IncomingRequest::new(RequestMethod::Get, "/svc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
