//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` assembles the request
//! pipeline, `start()` binds the TCP listener, and `serve()` starts
//! accepting connections. Callers can read the bound port between
//! `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{dispatch_handler, AppState, TokenAuthenticator};
use super::middleware::build_http_layers;
use crate::service::{build_request_pipeline, RequestRouter, ServerConfig};

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- wraps the request router in the dispatch pipeline
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, server: ServerConfig, router: RequestRouter) -> Self {
        let pipeline = build_request_pipeline(router, &server);
        let auth = config
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(TokenAuthenticator::new(secret.as_bytes())));

        let state = AppState {
            pipeline,
            network: Arc::new(config.clone()),
            server: Arc::new(server),
            auth,
        };

        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Returns the shared application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Assembles the axum router with the HTTP middleware stack.
    ///
    /// Every method and path reaches [`dispatch_handler`]; route resolution
    /// happens inside the request pipeline, not in axum.
    pub fn build_router(&self) -> Router {
        let layers = build_http_layers(&self.config);

        Router::new()
            .fallback(dispatch_handler)
            .layer(layers)
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// Consumes `self` because the listener is moved into the server.
    /// In-flight requests finish before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };

        info!("Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
