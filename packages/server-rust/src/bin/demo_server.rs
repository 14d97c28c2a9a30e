//! Demo server: the example note operations behind the HTTP transport.

use clap::Parser;
use switchyard_server::demo::{self, NoteStore};
use switchyard_server::{init_tracing, Cli, NetworkModule};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (network, server) = Cli::parse().into_configs()?;
    init_tracing(server.log_format, &server.log_filter)?;

    let store = NoteStore::default();
    let registry = demo::registry(&store);
    let router = demo::router(&registry, &store)?;

    let mut module = NetworkModule::new(network, server, router);
    let port = module.start().await?;
    info!(port, "switchyard demo listening");

    module
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await
}
