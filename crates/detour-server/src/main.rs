//! Detour Server - hazard-aware routing over OpenStreetMap roads

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use detour_server::api;
use detour_server::config::{Config, LogFormat};
use detour_server::persistence;
use detour_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    let filter = EnvFilter::from_default_env().add_directive("detour_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }

    tracing::info!("Starting Detour Server...");

    let db = persistence::init_database(&config.db_path, config.db_max_connections).await?;
    let counts = persistence::graph::graph_counts(db.pool()).await?;
    tracing::info!(nodes = counts.nodes, edges = counts.edges, "road graph loaded");

    let state = Arc::new(AppState::new(db, config));
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server_port));
    let app = api::app(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
