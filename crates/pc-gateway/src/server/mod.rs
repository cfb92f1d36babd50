//! HTTP and WebSocket server
//!
//! Serves `/scan`, `/ws` and `/health` until the cancellation token fires,
//! then tears down every remaining bridge session.

mod router;
mod routes;
mod socket;

pub use router::MessageRouter;
pub use routes::{build_router, ScanQuery};
pub use socket::handle_socket;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::state::GatewayState;

/// Bind `bind_addr` and serve until `cancel` fires
pub async fn serve(state: Arc<GatewayState>, bind_addr: &str, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    run(listener, state, cancel).await
}

/// Serve on an already bound listener until `cancel` fires
pub async fn run(listener: TcpListener, state: Arc<GatewayState>, cancel: CancellationToken) -> Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!("Gateway listening on {}", local_addr);

    let app = build_router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Gateway server shutting down");
    let closed = state.shutdown_sessions().await;
    if closed > 0 {
        tracing::info!("Closed {} active sessions", closed);
    }
    Ok(())
}
