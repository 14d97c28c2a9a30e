//! Switchyard Server: read/write request dispatch, the command/query
//! operation pipeline, and an axum HTTP transport.

pub mod cli;
pub mod demo;
pub mod network;
pub mod observability;
pub mod service;

pub use cli::{Cli, ConfigError};
pub use network::{NetworkConfig, NetworkModule};
pub use observability::{init_tracing, LogFormat};
pub use service::{OperationRegistry, RequestRouter, Response, ServerConfig};
