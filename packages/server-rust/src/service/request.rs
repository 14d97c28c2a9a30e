//! Request model: the incoming request and the per-side snapshots handlers see.

use bytes::Bytes;
use switchyard_core::{
    DestinationInfo, RequestContext, RequestData, RequestMethod, RequestValue, UriParams,
};

/// A request as handed over by the transport.
///
/// Exposes the destination, query or body parameters, the raw body and the
/// per-request context. It is immutable once built.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    destination: DestinationInfo,
    input: RequestData,
    body: Bytes,
    context: RequestContext,
}

impl IncomingRequest {
    #[must_use]
    pub fn new(method: RequestMethod, uri: impl Into<String>) -> Self {
        Self {
            destination: DestinationInfo::new(method, uri),
            input: RequestData::new(),
            body: Bytes::new(),
            context: RequestContext::default(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: RequestData) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn destination(&self) -> &DestinationInfo {
        &self.destination
    }

    #[must_use]
    pub fn method(&self) -> RequestMethod {
        self.destination.method()
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        self.destination.uri()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RequestValue> {
        self.input.get(key)
    }

    #[must_use]
    pub fn input(&self) -> &RequestData {
        &self.input
    }

    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// Accessors shared by the read and write snapshots.
macro_rules! snapshot_accessors {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn destination(&self) -> &DestinationInfo {
                &self.destination
            }

            #[must_use]
            pub fn method(&self) -> RequestMethod {
                self.destination.method()
            }

            #[must_use]
            pub fn uri(&self) -> &str {
                self.destination.uri()
            }

            /// Query/body parameters with URI parameters merged over them.
            #[must_use]
            pub fn input(&self) -> &RequestData {
                &self.input
            }

            #[must_use]
            pub fn get(&self, key: &str) -> Option<&RequestValue> {
                self.input.get(key)
            }

            #[must_use]
            pub fn get_str(&self, key: &str) -> Option<&str> {
                self.input.get_str(key)
            }

            /// Only the parameters captured by the matching route.
            #[must_use]
            pub fn uri_params(&self) -> &UriParams {
                &self.uri_params
            }

            #[must_use]
            pub fn context(&self) -> &RequestContext {
                &self.context
            }
        }
    };
}

/// What a read handler sees: query parameters merged with URI parameters.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    destination: DestinationInfo,
    input: RequestData,
    uri_params: UriParams,
    context: RequestContext,
}

impl ReadRequest {
    /// Snapshots `incoming`, letting `uri_params` override same-named
    /// query parameters.
    #[must_use]
    pub fn from_incoming(incoming: &IncomingRequest, uri_params: UriParams) -> Self {
        Self {
            destination: incoming.destination.clone(),
            input: incoming.input.clone().merge_uri_params(uri_params.clone()),
            uri_params,
            context: incoming.context.clone(),
        }
    }
}

snapshot_accessors!(ReadRequest);

/// What a write handler sees: body parameters merged with URI parameters,
/// plus the raw body.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    destination: DestinationInfo,
    input: RequestData,
    uri_params: UriParams,
    context: RequestContext,
    body: Bytes,
}

impl WriteRequest {
    /// Snapshots `incoming`, letting `uri_params` override same-named
    /// body parameters.
    #[must_use]
    pub fn from_incoming(incoming: &IncomingRequest, uri_params: UriParams) -> Self {
        Self {
            destination: incoming.destination.clone(),
            input: incoming.input.clone().merge_uri_params(uri_params.clone()),
            uri_params,
            context: incoming.context.clone(),
            body: incoming.body.clone(),
        }
    }

    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.body
    }
}

snapshot_accessors!(WriteRequest);
