//! Per-connection message router
//!
//! Each WebSocket connection gets one [`MessageRouter`]. It owns the
//! connection's state machine:
//!
//! ```text
//! Idle --start_session ok--> Active --close--> Closed
//!  ^                           |
//!  +------ shell exited -------+
//! ```
//!
//! Messages of one connection are dispatched strictly in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;

use pc_core::error::SessionError;
use pc_core::traits::SessionRequest;
use pc_core::{ConnectionId, TerminalSize};
use pc_protocol::{ClientMessage, ProtocolError, ServerMessage};

use crate::session::BridgeSession;
use crate::state::GatewayState;

/// Where a connection is in its lifecycle
#[derive(Debug)]
enum RouterState {
    /// No live session
    Idle,
    /// Session open and relaying
    Active(Arc<BridgeSession>),
    /// Connection gone; nothing more is dispatched
    Closed,
}

/// Routes one connection's client messages to its bridge session
pub struct MessageRouter {
    /// Shared gateway state
    state: Arc<GatewayState>,
    /// Connection served by this router
    connection: ConnectionId,
    /// Queue drained by the connection's writer task
    outbound: mpsc::Sender<ServerMessage>,
    /// Current lifecycle state
    current: RouterState,
}

impl MessageRouter {
    /// Create an idle router for `connection`
    pub fn new(
        state: Arc<GatewayState>,
        connection: ConnectionId,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            state,
            connection,
            outbound,
            current: RouterState::Idle,
        }
    }

    /// Connection served by this router
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Whether a live session is attached
    pub fn is_active(&mut self) -> bool {
        self.refresh();
        matches!(self.current, RouterState::Active(_))
    }

    /// Whether the router has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self.current, RouterState::Closed)
    }

    /// Decode and dispatch one text frame.
    ///
    /// Messages of an unrecognized `type` are skipped. Any other decode
    /// failure is returned to the caller, which ends the connection.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), ProtocolError> {
        match self.state.codec.decode_client(text)? {
            Some(message) => self.dispatch(message).await,
            None => tracing::debug!("{}: skipping message of unknown type", self.connection),
        }
        Ok(())
    }

    /// Dispatch one decoded client message
    pub async fn dispatch(&mut self, message: ClientMessage) {
        self.refresh();
        tracing::trace!("{}: dispatching {}", self.connection, message.kind());

        match message {
            ClientMessage::StartSession {
                hostname,
                username,
                password,
                cols,
                rows,
            } => {
                let size = TerminalSize::or_fallback(cols, rows, self.state.default_terminal_size());
                let request = SessionRequest {
                    host: hostname,
                    username,
                    password,
                    size,
                };
                self.start_session(request).await;
            }
            ClientMessage::Input { data } => self.forward_input(data.as_bytes()).await,
            ClientMessage::Resize { cols, rows } => self.forward_resize(cols, rows).await,
        }
    }

    /// Close the connection, tearing down any live session
    pub async fn close(&mut self) {
        let previous = std::mem::replace(&mut self.current, RouterState::Closed);
        if let RouterState::Active(session) = previous {
            session.teardown().await;
        }
        tracing::debug!("{}: router closed", self.connection);
    }

    /// Drop a session whose shell has exited on its own
    fn refresh(&mut self) {
        if let RouterState::Active(session) = &self.current {
            if session.is_closed() {
                tracing::debug!(
                    "{}: {} ended remotely, connection idle",
                    self.connection,
                    session.id()
                );
                self.current = RouterState::Idle;
            }
        }
    }

    async fn start_session(&mut self, request: SessionRequest) {
        match &self.current {
            RouterState::Idle => {}
            RouterState::Active(session) => {
                tracing::warn!(
                    "{}: start_session for {} refused, {} on {} is still active",
                    self.connection,
                    request.host,
                    session.id(),
                    session.host()
                );
                self.reply_error(SessionError::AlreadyActive).await;
                return;
            }
            RouterState::Closed => return,
        }

        let host = request.host.clone();
        match BridgeSession::open(&self.state, self.connection, request, self.outbound.clone()).await {
            Ok(session) => {
                self.current = RouterState::Active(session);
            }
            Err(e) => {
                tracing::warn!("{}: session to {} failed: {}", self.connection, host, e);
                self.reply_error(e).await;
            }
        }
    }

    async fn forward_input(&mut self, data: &[u8]) {
        let RouterState::Active(session) = &self.current else {
            tracing::debug!("{}: input with no active session dropped", self.connection);
            return;
        };

        let session = Arc::clone(session);
        match session.write_input(data).await {
            Ok(()) => {}
            Err(SessionError::Closed) => {
                tracing::debug!(
                    "{}: {} closed while input was pending",
                    self.connection,
                    session.id()
                );
                self.current = RouterState::Idle;
            }
            Err(e) => {
                tracing::warn!("{}: input to {} failed: {}", self.connection, session.id(), e);
                self.reply_error(e).await;
                session.teardown().await;
                self.current = RouterState::Idle;
            }
        }
    }

    async fn forward_resize(&mut self, cols: i64, rows: i64) {
        let RouterState::Active(session) = &self.current else {
            return;
        };
        let Some(size) = TerminalSize::from_dimensions(cols, rows) else {
            tracing::debug!("{}: ignoring resize to {}x{}", self.connection, cols, rows);
            return;
        };
        if let Err(e) = session.resize(size).await {
            tracing::debug!("{}: resize of {} failed: {}", self.connection, session.id(), e);
        }
    }

    async fn reply_error(&self, error: impl std::fmt::Display) {
        if self.outbound.send(ServerMessage::error(error)).await.is_err() {
            tracing::debug!("{}: client writer gone, error not delivered", self.connection);
        }
    }
}
