use anyhow::Context;
use clap::Parser;
use restgate_core::RestgateConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod error;
mod handlers;
mod headers;
mod routes;
mod state;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "restgate", version, about = "Secure REST gateway for Postgres")]
struct Cli {
    /// Path to restgate.yaml
    #[arg(long, env = "RESTGATE_CONFIG", default_value = "restgate.yaml")]
    config: PathBuf,

    /// Listen address, overriding server.bind
    #[arg(long, env = "RESTGATE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = RestgateConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let state = AppState::from_config(&config)?;
    tracing::info!(
        projects = state.pools().len(),
        role = %config.session.role,
        "Configuration loaded"
    );

    let app = routes::create_router(state.clone());

    let addr = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("restgate listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.pools().close().await;
    tracing::info!("restgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
