//! Route handlers that build an operation from the registry and run it.

use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::{Pattern, Route, UriParams};
use tracing::debug;

use crate::service::handler::{HandlesReadRequest, HandlesWriteRequest, ReadHandler, WriteHandler};
use crate::service::registry::{OperationKey, OperationRegistry, RegistryError};
use crate::service::request::{ReadRequest, WriteRequest};
use crate::service::response::Response;

/// URI parameter naming the domain when the operation comes from the URI.
pub const DOMAIN_PARAM: &str = "domain";

/// URI parameter naming the operation when it comes from the URI.
pub const OPERATION_PARAM: &str = "operation";

/// Which operation a handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTarget {
    /// Always the same operation.
    Fixed(OperationKey),
    /// Read from URI parameters captured by the matching route.
    FromUri {
        domain_param: String,
        operation_param: String,
    },
}

impl OperationTarget {
    /// Reads the domain and operation from the `domain` and `operation` URI
    /// parameters.
    #[must_use]
    pub fn from_uri() -> Self {
        Self::FromUri {
            domain_param: DOMAIN_PARAM.to_string(),
            operation_param: OPERATION_PARAM.to_string(),
        }
    }

    /// The operation key for a request whose route captured `params`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingUriParam` when a parameter the target
    /// reads was not captured.
    pub fn resolve(&self, params: &UriParams) -> Result<OperationKey, RegistryError> {
        match self {
            Self::Fixed(key) => Ok(key.clone()),
            Self::FromUri {
                domain_param,
                operation_param,
            } => {
                let lookup = |name: &str| {
                    params
                        .get(name)
                        .map(str::to_string)
                        .ok_or_else(|| RegistryError::MissingUriParam {
                            name: name.to_string(),
                        })
                };
                Ok(OperationKey::new(lookup(domain_param)?, lookup(operation_param)?))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandHandler
// ---------------------------------------------------------------------------

/// Write handler running registered commands.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    registry: Arc<OperationRegistry>,
    target: OperationTarget,
}

impl CommandHandler {
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry>, target: OperationTarget) -> Self {
        Self { registry, target }
    }

    /// A handler always running the command `domain/operation`.
    #[must_use]
    pub fn fixed(
        registry: Arc<OperationRegistry>,
        domain: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::new(registry, OperationTarget::Fixed(OperationKey::new(domain, operation)))
    }

    /// A handler running the command named by the URI.
    #[must_use]
    pub fn from_uri(registry: Arc<OperationRegistry>) -> Self {
        Self::new(registry, OperationTarget::from_uri())
    }

    /// Binds this handler to `pattern`.
    #[must_use]
    pub fn route(self, pattern: Pattern) -> Route<WriteHandler> {
        Route::new(pattern, Arc::new(self) as WriteHandler)
    }
}

#[async_trait]
impl HandlesWriteRequest for CommandHandler {
    async fn handle(&self, request: &WriteRequest) -> anyhow::Result<Response> {
        let key = self.target.resolve(request.uri_params())?;
        debug!(operation = %key, "running command");
        let operation = self.registry.build_command(&key, request)?;
        operation.run_command(request.context()).await
    }
}

// ---------------------------------------------------------------------------
// QueryHandler
// ---------------------------------------------------------------------------

/// Read handler running registered queries.
#[derive(Debug, Clone)]
pub struct QueryHandler {
    registry: Arc<OperationRegistry>,
    target: OperationTarget,
}

impl QueryHandler {
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry>, target: OperationTarget) -> Self {
        Self { registry, target }
    }

    #[must_use]
    pub fn fixed(
        registry: Arc<OperationRegistry>,
        domain: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::new(registry, OperationTarget::Fixed(OperationKey::new(domain, operation)))
    }

    #[must_use]
    pub fn from_uri(registry: Arc<OperationRegistry>) -> Self {
        Self::new(registry, OperationTarget::from_uri())
    }

    #[must_use]
    pub fn route(self, pattern: Pattern) -> Route<ReadHandler> {
        Route::new(pattern, Arc::new(self) as ReadHandler)
    }
}

#[async_trait]
impl HandlesReadRequest for QueryHandler {
    async fn handle(&self, request: &ReadRequest) -> anyhow::Result<Response> {
        let key = self.target.resolve(request.uri_params())?;
        debug!(operation = %key, "running query");
        let operation = self.registry.build_query(&key, request)?;
        operation.run_query(request.context()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
