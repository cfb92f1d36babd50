//! Bridge session construction, control and teardown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use pc_core::error::SessionError;
use pc_core::traits::{SessionRequest, ShellControl, ShellHandles, ShellInput};
use pc_core::{ConnectionId, SessionId, TerminalSize};
use pc_protocol::ServerMessage;

use super::relay;
use crate::registry::ConnectionRegistry;
use crate::state::GatewayState;

/// One client's live remote shell
pub struct BridgeSession {
    /// Session ID
    id: SessionId,
    /// Owning client connection
    connection: ConnectionId,
    /// Remote host, for logging
    host: String,
    /// Shell stdin; `None` once shut down
    input: Mutex<Option<ShellInput>>,
    /// Window-change and close operations
    control: Box<dyn ShellControl>,
    /// Registry this session is entered in
    registry: Arc<ConnectionRegistry<BridgeSession>>,
    /// Set by the first teardown
    closed: AtomicBool,
    /// Fired by the first teardown; aborts pending input writes
    closing: CancellationToken,
}

impl BridgeSession {
    /// Open a remote shell for `connection` and start relaying its output.
    ///
    /// On success the session is registered and its relay task is running.
    /// On failure nothing is registered and everything the connector
    /// acquired has been released.
    pub async fn open(
        state: &GatewayState,
        connection: ConnectionId,
        request: SessionRequest,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> Result<Arc<Self>, SessionError> {
        let ShellHandles {
            input,
            output,
            control,
        } = state.connector.open_shell(&request).await?;

        let session = Arc::new(Self {
            id: state.ids.next_session(),
            connection,
            host: request.host,
            input: Mutex::new(Some(input)),
            control,
            registry: Arc::clone(&state.registry),
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
        });

        if let Some(previous) = state.registry.put(connection, Arc::clone(&session)) {
            if !previous.is_closed() {
                tracing::warn!(
                    "{} replaced live {} on {}",
                    session.id,
                    previous.id,
                    connection
                );
            }
        }

        tracing::info!(
            "{} opened on {} as {}@{} ({})",
            session.id,
            connection,
            request.username,
            session.host,
            request.size
        );

        tokio::spawn(relay::run(
            Arc::clone(&session),
            output,
            outbound,
            state.config.relay_chunk_size,
        ));

        Ok(session)
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Owning connection
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Remote host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether teardown has started
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Write bytes verbatim to the shell's stdin.
    ///
    /// A write still pending when teardown starts is abandoned with
    /// [`SessionError::Closed`], so a shell that stops reading cannot hold
    /// the session open.
    pub async fn write_input(&self, data: &[u8]) -> Result<(), SessionError> {
        let mut guard = tokio::select! {
            biased;
            _ = self.closing.cancelled() => return Err(SessionError::Closed),
            guard = self.input.lock() => guard,
        };
        let input = guard.as_mut().ok_or(SessionError::Closed)?;

        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(SessionError::Closed),
            result = async {
                input.write_all(data).await?;
                input.flush().await
            } => Ok(result?),
        }
    }

    /// Forward a window change to the remote PTY
    pub async fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.control.resize(size).await
    }

    /// Release the session.
    ///
    /// Shuts down stdin, closes the shell channel, disconnects the
    /// transport, then removes the registry entry if it still refers to this
    /// session. Only the first call does anything; close failures are logged.
    pub async fn teardown(self: &Arc<Self>) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.closing.cancel();

        tracing::info!("Tearing down {} on {} ({})", self.id, self.connection, self.host);

        if let Some(mut input) = self.input.lock().await.take() {
            if let Err(e) = input.shutdown().await {
                tracing::debug!("{}: input shutdown failed: {}", self.id, e);
            }
        }

        if let Err(e) = self.control.close_channel().await {
            tracing::debug!("{}: channel close failed: {}", self.id, e);
        }

        if let Err(e) = self.control.disconnect().await {
            tracing::debug!("{}: disconnect failed: {}", self.id, e);
        }

        if !self.registry.remove_if_same(self.connection, self) {
            tracing::debug!("{}: registry entry already replaced or removed", self.id);
        }
    }
}

impl std::fmt::Debug for BridgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSession")
            .field("id", &self.id)
            .field("connection", &self.connection)
            .field("host", &self.host)
            .field("closed", &self.is_closed())
            .finish()
    }
}
