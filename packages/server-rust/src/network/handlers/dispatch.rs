//! Fallback handler: converts every HTTP request into an [`IncomingRequest`],
//! runs it through the request pipeline and writes the [`Response`] back.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use switchyard_core::{Principal, RequestContext, RequestData, RequestMethod};
use tower::ServiceExt;
use tracing::debug;

use super::AppState;
use crate::service::{IncomingRequest, Response};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors raised while turning an HTTP request into an [`IncomingRequest`].
///
/// These never reach the dispatcher; the transport answers them directly.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unsupported request method: {0}")]
    UnsupportedMethod(String),
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("malformed query string: {0}")]
    MalformedQuery(#[source] serde_urlencoded::de::Error),
    #[error("malformed form body: {0}")]
    MalformedForm(#[source] serde_urlencoded::de::Error),
    #[error("malformed JSON body: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("invalid bearer token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

impl TransportError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedQuery(_) | Self::MalformedForm(_) | Self::MalformedJson(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> axum::response::Response {
        debug!(error = %self, "rejecting request at transport");
        Response::text(self.status(), self.to_string()).into_response()
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let outcome = self.outcome();
        let (status, headers, body) = self.into_parts();
        let mut response = (status, headers, body).into_response();
        response.extensions_mut().insert(outcome);
        response
    }
}

/// Handles every request the axum router receives.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    request: Request,
) -> axum::response::Response {
    let incoming = match to_incoming(&state, request).await {
        Ok(incoming) => incoming,
        Err(err) => return err.into_response(),
    };

    match state.pipeline.clone().oneshot(incoming).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

async fn to_incoming(state: &AppState, request: Request) -> Result<IncomingRequest, TransportError> {
    let (parts, body) = request.into_parts();

    let method: RequestMethod = parts
        .method
        .as_str()
        .parse()
        .map_err(|_| TransportError::UnsupportedMethod(parts.method.to_string()))?;

    let mut input = match parts.uri.query() {
        Some(query) => parse_pairs(query.as_bytes()).map_err(TransportError::MalformedQuery)?,
        None => RequestData::new(),
    };

    let body = read_body(body, state.network.max_body_bytes).await?;
    if !body.is_empty() {
        for (key, value) in parse_body(&parts.headers, &body)?.iter() {
            input.insert(key, value.clone());
        }
    }

    let mut context = RequestContext::new(
        request_id(&parts.headers),
        channel(&parts.headers, &state.server.default_channel),
    );
    if let Some(principal) = principal(state, &parts.headers)? {
        context = context.with_principal(principal);
    }

    Ok(IncomingRequest::new(method, parts.uri.path())
        .with_input(input)
        .with_body(body)
        .with_context(context))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, TransportError> {
    // Reading only fails past the size limit or on a dropped connection.
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| TransportError::PayloadTooLarge { limit })
}

fn parse_pairs(raw: &[u8]) -> Result<RequestData, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw)?;
    Ok(RequestData::from_pairs(pairs))
}

/// Decodes form and JSON bodies; any other content type contributes no
/// parameters and is only available as the raw body.
fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<RequestData, TransportError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        return parse_pairs(body).map_err(TransportError::MalformedForm);
    }
    if content_type.starts_with("application/json") {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(TransportError::MalformedJson)?;
        return Ok(match value {
            serde_json::Value::Object(map) => RequestData::from(map),
            _ => RequestData::new(),
        });
    }
    Ok(RequestData::new())
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string)
}

/// Picks the response channel from the `Accept` header.
fn channel(headers: &HeaderMap, default_channel: &str) -> String {
    let accept = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let channel = if accept.contains("application/json") {
        "json"
    } else if accept.contains("text/html") {
        "html"
    } else if accept.contains("text/plain") {
        "text"
    } else {
        default_channel
    };
    channel.to_string()
}

fn principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, TransportError> {
    let Some(auth) = &state.auth else {
        return Ok(None);
    };
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };
    auth.verify(token.trim())
        .map(Some)
        .map_err(TransportError::InvalidToken)
}
