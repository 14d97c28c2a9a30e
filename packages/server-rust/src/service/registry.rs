use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use switchyard_core::Side;

use super::domain::{DomainCommand, DomainQuery};
use super::operation::Operation;
use super::request::{ReadRequest, WriteRequest};

// ---------------------------------------------------------------------------
// OperationKey
// ---------------------------------------------------------------------------

/// Identifies an operation by its domain and name, e.g. `("orders", "cancel")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
    pub domain: String,
    pub operation: String,
}

impl OperationKey {
    #[must_use]
    pub fn new(domain: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.operation)
    }
}

/// Errors raised while building an operation for a request.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no command registered for {key}")]
    UnknownCommand { key: OperationKey },
    #[error("no query registered for {key}")]
    UnknownQuery { key: OperationKey },
    #[error("route did not capture the URI parameter {name:?}")]
    MissingUriParam { name: String },
}

/// Builds a command from the request it serves.
pub type CommandFactory =
    Arc<dyn Fn(&WriteRequest) -> anyhow::Result<Box<dyn DomainCommand>> + Send + Sync>;

/// Builds a query from the request it serves.
pub type QueryFactory =
    Arc<dyn Fn(&ReadRequest) -> anyhow::Result<Box<dyn DomainQuery>> + Send + Sync>;

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Registry of command and query factories keyed by [`OperationKey`].
///
/// Shared between concurrent requests; registration may happen at any time,
/// but is normally finished before the server starts.
pub struct OperationRegistry {
    commands: DashMap<OperationKey, CommandFactory>,
    queries: DashMap<OperationKey, QueryFactory>,
    /// Registration order, for listing.
    order: RwLock<Vec<(Side, OperationKey)>>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: DashMap::new(),
            queries: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Registers `factory` as the builder for the command `key`. A later
    /// registration for the same key replaces the earlier one.
    pub fn register_command<C, F>(&self, key: OperationKey, factory: F)
    where
        C: DomainCommand + 'static,
        F: Fn(&WriteRequest) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        let factory: CommandFactory = Arc::new(move |request: &WriteRequest| {
            factory(request).map(|command| Box::new(command) as Box<dyn DomainCommand>)
        });
        if self.commands.insert(key.clone(), factory).is_none() {
            self.order.write().push((Side::Write, key));
        }
    }

    /// Registers `factory` as the builder for the query `key`.
    pub fn register_query<Q, F>(&self, key: OperationKey, factory: F)
    where
        Q: DomainQuery + 'static,
        F: Fn(&ReadRequest) -> anyhow::Result<Q> + Send + Sync + 'static,
    {
        let factory: QueryFactory = Arc::new(move |request: &ReadRequest| {
            factory(request).map(|query| Box::new(query) as Box<dyn DomainQuery>)
        });
        if self.queries.insert(key.clone(), factory).is_none() {
            self.order.write().push((Side::Read, key));
        }
    }

    /// Builds the command `key` for `request`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownCommand` when nothing is registered for
    /// `key`, or the factory's own error.
    pub fn build_command(
        &self,
        key: &OperationKey,
        request: &WriteRequest,
    ) -> anyhow::Result<Operation<dyn DomainCommand>> {
        // Clone the factory so the map guard is released before it runs.
        let factory = self
            .commands
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::UnknownCommand { key: key.clone() })?;

        let command = factory(request)?;
        Ok(Operation::new(
            command,
            request.input().clone(),
            request.context().channel.clone(),
        ))
    }

    /// Builds the query `key` for `request`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownQuery` when nothing is registered for
    /// `key`, or the factory's own error.
    pub fn build_query(
        &self,
        key: &OperationKey,
        request: &ReadRequest,
    ) -> anyhow::Result<Operation<dyn DomainQuery>> {
        let factory = self
            .queries
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::UnknownQuery { key: key.clone() })?;

        let query = factory(request)?;
        Ok(Operation::new(
            query,
            request.input().clone(),
            request.context().channel.clone(),
        ))
    }

    #[must_use]
    pub fn contains_command(&self, key: &OperationKey) -> bool {
        self.commands.contains_key(key)
    }

    #[must_use]
    pub fn contains_query(&self, key: &OperationKey) -> bool {
        self.queries.contains_key(key)
    }

    /// Every registered operation with its side, in registration order.
    #[must_use]
    pub fn registered(&self) -> Vec<(Side, OperationKey)> {
        self.order.read().clone()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("commands", &self.commands.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use switchyard_core::{RequestContext, RequestMethod, UriParams};

    use super::*;
    use crate::service::domain::Validatable;
    use crate::service::operation::OperationState;
    use crate::service::request::IncomingRequest;
    use crate::service::responder::Responder;
    use crate::service::validator::Validator;

    struct Noop;

    impl Validatable for Noop {
        fn validate(&self, _validator: &mut dyn Validator) {}
    }

    #[async_trait]
    impl DomainCommand for Noop {
        async fn execute(&mut self, _responder: &mut Responder) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl DomainQuery for Noop {
        async fn query(&mut self, _responder: &mut Responder) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn write_request() -> WriteRequest {
        let incoming = IncomingRequest::new(RequestMethod::Post, "/orders/cancel")
            .with_context(RequestContext::new("req-1", "html"));
        WriteRequest::from_incoming(&incoming, UriParams::new())
    }

    #[test]
    fn builds_registered_command_with_request_channel() {
        let registry = OperationRegistry::new();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        registry.register_command(OperationKey::new("orders", "cancel"), move |_request| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Noop)
        });

        let op = registry
            .build_command(&OperationKey::new("orders", "cancel"), &write_request())
            .unwrap();
        assert_eq!(op.state(), OperationState::Created);
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(format!("{op:?}").contains("html"));
    }

    #[test]
    fn unknown_command_is_a_registry_error() {
        let registry = OperationRegistry::new();
        let err = registry
            .build_command(&OperationKey::new("orders", "cancel"), &write_request())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownCommand { key }) if key.to_string() == "orders/cancel"
        ));
    }

    #[test]
    fn commands_and_queries_are_separate() {
        let registry = OperationRegistry::new();
        let key = OperationKey::new("orders", "list");
        registry.register_query(key.clone(), |_request| Ok(Noop));

        assert!(registry.contains_query(&key));
        assert!(!registry.contains_command(&key));
        let err = registry.build_command(&key, &write_request()).unwrap_err();
        assert!(err.downcast_ref::<RegistryError>().is_some());
    }

    #[test]
    fn factory_errors_propagate() {
        let registry = OperationRegistry::new();
        let key = OperationKey::new("orders", "cancel");
        registry.register_command(key.clone(), |_request| -> anyhow::Result<Noop> {
            anyhow::bail!("order id missing")
        });

        let err = registry.build_command(&key, &write_request()).unwrap_err();
        assert_eq!(err.to_string(), "order id missing");
    }

    #[test]
    fn registered_lists_in_registration_order_once() {
        let registry = OperationRegistry::new();
        registry.register_command(OperationKey::new("b", "write"), |_request| Ok(Noop));
        registry.register_query(OperationKey::new("a", "read"), |_request| Ok(Noop));
        registry.register_command(OperationKey::new("b", "write"), |_request| Ok(Noop));

        assert_eq!(
            registry.registered(),
            vec![
                (Side::Write, OperationKey::new("b", "write")),
                (Side::Read, OperationKey::new("a", "read")),
            ]
        );
    }
}
