//! Response staging for operations: responses are registered per channel and
//! the one matching the request's channel is sent exactly once.

use super::response::Response;

/// Which channels a staged response applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseScope {
    /// Any channel without a more specific response.
    All,
    /// One named channel, such as `"json"` or `"html"`.
    Channel(String),
}

impl ResponseScope {
    #[must_use]
    pub fn channel(name: impl Into<String>) -> Self {
        Self::Channel(name.into())
    }
}

/// Stages responses during an operation and picks the one to send.
///
/// `respond` consumes the responder, so at most one response is ever sent.
#[derive(Debug)]
pub struct Responder {
    channel: String,
    staged: Vec<(ResponseScope, Response)>,
}

impl Responder {
    /// A responder for requests arriving on `channel`.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            staged: Vec::new(),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Stages `response` for `scope`, replacing anything staged for the same
    /// scope earlier.
    pub fn add(&mut self, scope: ResponseScope, response: Response) {
        if let Some(slot) = self.staged.iter_mut().find(|(s, _)| *s == scope) {
            slot.1 = response;
        } else {
            self.staged.push((scope, response));
        }
    }

    /// Stages a `400 Bad Request` carrying `messages` for every channel.
    pub fn add_bad_request(&mut self, messages: &[String]) {
        self.add(ResponseScope::All, Response::bad_request(messages));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// The response staged for this responder's channel, else the one staged
    /// for all channels, else `204 No Content`.
    #[must_use]
    pub fn respond(self) -> Response {
        let Self { channel, staged } = self;
        let mut fallback = None;
        for (scope, response) in staged {
            match scope {
                ResponseScope::Channel(name) if name == channel => return response,
                ResponseScope::All => fallback = Some(response),
                ResponseScope::Channel(_) => {}
            }
        }
        fallback.unwrap_or_else(Response::no_content)
    }
}
