//! Domain capabilities: commands and queries that run through the operation
//! lifecycle, and the handlers that bind them to routes.

pub mod handlers;

use async_trait::async_trait;
use switchyard_core::{RequestContext, RequestData};

use crate::service::responder::Responder;
use crate::service::validator::{RequestValidator, Validator};

pub use handlers::{CommandHandler, OperationTarget, QueryHandler};

/// Declares the validation rules of an operation and the validator they run
/// against.
pub trait Validatable: Send + Sync {
    /// Builds this operation's validator over the merged request input.
    ///
    /// Defaults to a [`RequestValidator`]; override to plug in another
    /// [`Validator`].
    fn validator(&self, input: RequestData) -> Box<dyn Validator> {
        Box::new(RequestValidator::new(input))
    }

    /// Applies every rule to `validator`. Must not depend on anything but the
    /// validator's input, so that re-validation gives the same result.
    fn validate(&self, validator: &mut dyn Validator);
}

/// A state-changing operation, served on the write side.
#[async_trait]
pub trait DomainCommand: Validatable {
    /// Whether only authenticated callers may run this command.
    fn needs_logged_in_user(&self) -> bool {
        true
    }

    /// Additional authorization check against the caller's context.
    fn is_executable(&self, _context: &RequestContext) -> bool {
        true
    }

    /// The business action. Runs at most once per request, after
    /// authorization and validation passed.
    async fn execute(&mut self, responder: &mut Responder) -> anyhow::Result<()>;
}

/// A read-only operation, served on the read side.
#[async_trait]
pub trait DomainQuery: Validatable {
    fn needs_logged_in_user(&self) -> bool {
        false
    }

    async fn query(&mut self, responder: &mut Responder) -> anyhow::Result<()>;
}
