use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lancegate::config::Config;
use lancegate::gateway::GatewayState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Marketplace edge gateway starting ===");
    info!("Port: {}", config.port);

    let state = Arc::new(GatewayState::new(config.clone()));
    for route in state.routes.routes() {
        info!(prefix = route.prefix, service = route.service, "route registered");
    }

    let app = lancegate::build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port)
        .parse()
        .context("failed to parse bind address")?;

    info!("gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
