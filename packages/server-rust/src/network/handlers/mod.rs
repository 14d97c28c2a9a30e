//! HTTP handler definitions for the Switchyard server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions for building the router.

pub mod auth;
pub mod dispatch;

pub use auth::{Claims, TokenAuthenticator};
pub use dispatch::{dispatch_handler, TransportError};

use std::sync::Arc;

use super::NetworkConfig;
use crate::service::{Pipeline, ServerConfig};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The request pipeline every request is dispatched through.
    pub pipeline: Pipeline,
    /// Network configuration (bind address, limits, token secret).
    pub network: Arc<NetworkConfig>,
    /// Dispatch configuration (default channel, load shedding).
    pub server: Arc<ServerConfig>,
    /// Bearer token verifier; `None` leaves every request anonymous.
    pub auth: Option<Arc<TokenAuthenticator>>,
}
