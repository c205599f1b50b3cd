//! goldroute server: runs the API front (§4.5) over the venue adapters,
//! portfolio aggregator, and trading engine built from the process
//! environment.

use anyhow::Result;
use goldroute::application::Application;
use goldroute::config::Config;
use goldroute::interfaces::build_router;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("goldroute server {} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let bind_address = config.api.bind_address.clone();
    let port = config.api.port;

    let app = Arc::new(Application::build(config).await?);
    let router = build_router(app);

    let addr = format!("{bind_address}:{port}");
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
