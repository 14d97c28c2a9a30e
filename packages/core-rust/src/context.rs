use serde::{Deserialize, Serialize};

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for the authenticated entity.
    pub id: String,
    /// Roles assigned to this principal for authorization checks.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Per-request context carrying identity and tracing information.
///
/// Built by the transport for every request and passed down explicitly;
/// nothing in the dispatch path reads ambient process state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestContext {
    /// Correlation identifier, echoed in logs and the `x-request-id` header.
    pub request_id: String,
    /// Authenticated principal, if the request is authenticated.
    pub principal: Option<Principal>,
    /// Response channel the client asked for (e.g. `"json"`).
    pub channel: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            principal: None,
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Whether a logged-in principal is attached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
