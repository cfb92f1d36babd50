//! HTTP routes

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use super::socket::handle_socket;
use crate::discovery::parse_subnet;
use crate::state::GatewayState;

/// Query string accepted by `/scan`
#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    /// Subnet to sweep instead of the configured one
    pub subnet: Option<String>,
}

/// Build the gateway's router.
///
/// CORS is permissive: the browser UI may be served from any origin on the
/// LAN.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/scan", get(scan_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Sweep a subnet and list the hosts found
async fn scan_handler(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ScanQuery>,
) -> Response {
    let subnet = match query.subnet.as_deref() {
        Some(raw) => match parse_subnet(raw) {
            Ok(subnet) => subnet,
            Err(e) => {
                tracing::debug!("Rejected scan request: {}", e);
                let body = serde_json::json!({ "error": e.to_string() });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        },
        None => state.config.scan.subnet,
    };

    tracing::info!("Scanning {}", subnet);
    Json(state.resolver.scan(subnet).await).into_response()
}

/// Upgrade to the terminal bridge channel
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Liveness probe
async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.registry.len(),
    }))
}
