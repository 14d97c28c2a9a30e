//! Terminal response produced for every request.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::json;
use switchyard_core::RequestMethod;

const JSON_UTF8: &str = "application/json; charset=utf-8";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";

/// How a request ended. Carried alongside the response for logging and
/// metrics; never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler produced the response directly.
    Handled,
    /// A command or query passed authorization and validation and ran.
    Executed,
    /// The operation was not executable for the caller.
    Forbidden,
    /// Validation failed; the body carries the messages.
    Invalid,
    /// No route matched; the final responder answered.
    NoRoute,
    /// The handler failed unexpectedly; the final responder answered.
    Failed,
    /// An `OPTIONS` request was answered from the route tables.
    Options,
    /// The request was shed before dispatch because the server was busy.
    Overloaded,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handled => "handled",
            Self::Executed => "executed",
            Self::Forbidden => "forbidden",
            Self::Invalid => "invalid",
            Self::NoRoute => "no_route",
            Self::Failed => "failed",
            Self::Options => "options",
            Self::Overloaded => "overloaded",
        }
    }
}

/// A transport-independent HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    outcome: Outcome,
}

impl Response {
    /// An empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            outcome: Outcome::Handled,
        }
    }

    /// A JSON response.
    #[must_use]
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))
            .with_body(value.to_string())
    }

    /// A `200 OK` JSON response.
    #[must_use]
    pub fn ok_json(value: &serde_json::Value) -> Self {
        Self::json(StatusCode::OK, value)
    }

    /// A plain text response.
    #[must_use]
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_UTF8))
            .with_body(body.into())
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// `400 Bad Request` carrying validation messages as `{"messages": [...]}`.
    #[must_use]
    pub fn bad_request(messages: &[String]) -> Self {
        Self::json(StatusCode::BAD_REQUEST, &json!({ "messages": messages }))
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::text(StatusCode::FORBIDDEN, "Forbidden.")
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "No route matched.")
    }

    #[must_use]
    pub fn internal_error() -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    }

    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::text(StatusCode::SERVICE_UNAVAILABLE, "Server overloaded, try again later.")
            .with_outcome(Outcome::Overloaded)
    }

    /// `200 OK` with an `Allow` header listing `allowed`, comma separated.
    #[must_use]
    pub fn options<'a>(allowed: impl IntoIterator<Item = &'a RequestMethod>) -> Self {
        let allow = allowed
            .into_iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",");
        // Method names are ASCII, so the header value is always valid.
        let allow = HeaderValue::from_str(&allow).unwrap_or(HeaderValue::from_static(""));
        Self::text(StatusCode::OK, "")
            .with_header(ALLOW, allow)
            .with_outcome(Outcome::Options)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Drops the body but keeps status and headers (for `HEAD`).
    pub fn strip_body(&mut self) {
        self.body = Bytes::new();
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Splits into status, headers and body for a transport to write out.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
