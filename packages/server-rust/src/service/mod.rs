//! Request dispatch and the command/query pipeline.
//!
//! 1. **Routing** (`router`): splits requests by method, answers `OPTIONS`
//! 2. **Dispatch** (`dispatcher`): resolves routes, guarantees one response
//! 3. **Fallback** (`fallback`): no-route and uncaught-failure responses
//! 4. **Operations** (`operation`, `domain`, `registry`): authorize, validate,
//!    execute, respond
//! 5. **Middleware** (`middleware`): Tower layers (metrics, load-shedding)

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod fallback;
pub mod handler;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod request;
pub mod responder;
pub mod response;
pub mod router;
pub mod validator;

// Re-export key types for convenient access.
pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, ReadDispatcher, WriteDispatcher};
pub use domain::{
    CommandHandler, DomainCommand, DomainQuery, OperationTarget, QueryHandler, Validatable,
};
pub use fallback::{DefaultFinalResponder, DispatchError, FinalResponders, RespondsFinally};
pub use handler::{
    read_fn, write_fn, DispatchSide, HandlesReadRequest, HandlesWriteRequest, ReadHandler,
    ReadSide, WriteHandler, WriteSide,
};
pub use middleware::{build_request_pipeline, Pipeline};
pub use operation::{Operation, OperationState};
pub use registry::{OperationKey, OperationRegistry, RegistryError};
pub use request::{IncomingRequest, ReadRequest, WriteRequest};
pub use responder::{Responder, ResponseScope};
pub use response::{Outcome, Response};
pub use router::{RequestRouter, RequestRouterBuilder};
pub use validator::{RequestValidator, Validator};
