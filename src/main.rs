//! Tank Duel relay server
//!
//! Forwards peer messages between connections. It handles:
//! - WebSocket connections, paired into two-player sessions
//! - A health endpoint
//! - Optional static hosting of a browser client

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use tank_duel::app::AppState;
use tank_duel::config::Config;
use tank_duel::http::build_router;
use tank_duel::util::logging::init_tracing;
use tank_duel::util::shutdown::shutdown_signal;
use tank_duel::util::time::init_server_time;
use tank_duel::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_format);

    // Initialize server time tracking
    init_server_time();

    info!(version = VERSION, "Starting Tank Duel relay");
    info!("Server address: {}", config.server_addr);
    info!(mode = ?config.relay_mode, "Relay mode");

    // Create application state
    let state = AppState::new(config.clone());

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
