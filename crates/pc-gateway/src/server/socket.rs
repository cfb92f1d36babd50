//! WebSocket connection loop

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use pc_protocol::{MessageCodec, ProtocolError, ServerMessage};

use super::router::MessageRouter;
use crate::state::GatewayState;

/// Serve one client connection until it closes or misbehaves.
///
/// The socket is split: a writer task owns the sink and drains the
/// connection's outbound queue, while this task reads frames and feeds them
/// to the router one at a time.
pub async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let connection = state.ids.next_connection();
    tracing::info!("{}: client connected", connection);

    let (sink, mut stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_queue);
    let writer = tokio::spawn(write_loop(sink, outbound_rx, state.codec));

    let mut router = MessageRouter::new(Arc::clone(&state), connection, outbound_tx);

    while let Some(frame) = stream.next().await {
        let result = match frame {
            Ok(Message::Text(text)) => router.handle_text(&text).await,
            Ok(Message::Binary(_)) => Err(ProtocolError::UnsupportedFrame("binary")),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Ok(()),
            Ok(Message::Close(_)) => {
                tracing::debug!("{}: close frame received", connection);
                break;
            }
            Err(e) => {
                tracing::debug!("{}: read error: {}", connection, e);
                break;
            }
        };

        if let Err(e) = result {
            tracing::warn!("{}: protocol error, closing connection: {}", connection, e);
            break;
        }
    }

    router.close().await;
    // The writer exits on its own once the router and relay have dropped
    // their outbound senders.
    drop(writer);

    tracing::info!("{}: client disconnected", connection);
}

/// Encode queued messages onto the socket until the queue closes
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    codec: MessageCodec,
) {
    while let Some(message) = outbound.recv().await {
        let text = match codec.encode_server(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode outbound message: {}", e);
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
