//! Tavern Arena Server
//!
//! Authoritative battle server binary. Binds the WebSocket listener
//! and runs until interrupted.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tavern_arena::network::server::{ArenaServer, ServerConfig};
use tavern_arena::{AI_THINK_DELAY_MS, GRACE_PERIOD_SECS, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();

    info!("Tavern Arena Server v{}", VERSION);
    info!("Computer think delay: {} ms", AI_THINK_DELAY_MS);
    info!("Disconnect grace period: {} s", GRACE_PERIOD_SECS);

    let config = ServerConfig {
        bind_addr,
        ..Default::default()
    };

    let server = ArenaServer::new(config);

    tokio::select! {
        result = server.run() => {
            result.context("server terminated")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
