//! Request destination: the `(method, uri)` pair a request targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP request method as understood by the router.
///
/// Only the method name matters for routing; anything else about the
/// request line is the transport's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Connect,
    Trace,
}

/// Which dispatcher serves a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Queries: `GET`, `HEAD`.
    Read,
    /// Commands: `POST`, `PUT`, `PATCH`, `DELETE`.
    Write,
    /// Preflight / capability discovery: `OPTIONS`.
    Options,
}

impl Side {
    /// Lowercase label used in log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Options => "options",
        }
    }
}

impl RequestMethod {
    /// All methods in canonical order (used for `Allow` headers).
    pub const ALL: [RequestMethod; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
        Self::Connect,
        Self::Trace,
    ];

    /// Uppercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
        }
    }

    /// The dispatcher side responsible for this method.
    ///
    /// `CONNECT` and `TRACE` have no side and are never routed.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Get | Self::Head => Some(Side::Read),
            Self::Post | Self::Put | Self::Patch | Self::Delete => Some(Side::Write),
            Self::Options => Some(Side::Options),
            Self::Connect | Self::Trace => None,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported request method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for RequestMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// The `(method, uri)` pair identifying what a request targets.
///
/// Produced once per incoming request and read-only afterwards. `uri` is the
/// path component only; the transport strips the query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationInfo {
    method: RequestMethod,
    uri: String,
}

impl DestinationInfo {
    #[must_use]
    pub fn new(method: RequestMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
        }
    }

    #[must_use]
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for DestinationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}
