//! SSH dial, authentication and shell start

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;

use pc_core::config::SshSettings;
use pc_core::error::SessionError;
use pc_core::traits::{SessionRequest, ShellConnector, ShellHandles};
use pc_core::TerminalSize;

use super::channel::{self, SshControl};

/// Opens interactive shells over SSH
pub struct SshConnector {
    /// Remote port
    port: u16,
    /// Bound on dial plus authentication
    connect_timeout: Duration,
    /// Terminal type requested with the PTY
    term: String,
    /// russh client configuration, shared by every dial
    config: Arc<Config>,
}

impl SshConnector {
    /// Create a connector from settings
    pub fn new(settings: &SshSettings) -> Self {
        Self {
            port: settings.port,
            connect_timeout: settings.connect_timeout,
            term: settings.term.clone(),
            config: Arc::new(Config::default()),
        }
    }

    /// Dial and authenticate
    async fn connect(&self, request: &SessionRequest) -> Result<Handle<GatewayClient>, SessionError> {
        let handler = GatewayClient {
            host: request.host.clone(),
        };

        tracing::debug!("Connecting to {}:{}", request.host, self.port);
        let mut handle = client::connect(
            Arc::clone(&self.config),
            (request.host.as_str(), self.port),
            handler,
        )
        .await
        .map_err(|e| SessionError::Connect {
            host: request.host.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Authenticating as '{}' on {}", request.username, request.host);
        let authenticated = match handle
            .authenticate_password(request.username.clone(), request.password.clone())
            .await
        {
            Ok(authenticated) => authenticated,
            Err(e) => {
                release_transport(&handle).await;
                return Err(SessionError::Connect {
                    host: request.host.clone(),
                    reason: format!("authentication failed: {}", e),
                });
            }
        };

        if !authenticated {
            release_transport(&handle).await;
            return Err(SessionError::AuthenticationRejected {
                user: request.username.clone(),
            });
        }

        Ok(handle)
    }

    /// Request a PTY and a shell on a fresh channel.
    ///
    /// Returns any output the server sent before confirming the shell.
    async fn start_shell(
        &self,
        channel: &mut Channel<Msg>,
        size: TerminalSize,
    ) -> Result<Vec<u8>, SessionError> {
        let mut early_output = Vec::new();

        channel
            .request_pty(true, &self.term, u32::from(size.cols), u32::from(size.rows), 0, 0, &[])
            .await
            .map_err(|e| SessionError::PtyAllocation(e.to_string()))?;
        await_reply(channel, &mut early_output)
            .await
            .map_err(SessionError::PtyAllocation)?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| SessionError::ShellStart(e.to_string()))?;
        await_reply(channel, &mut early_output)
            .await
            .map_err(SessionError::ShellStart)?;

        Ok(early_output)
    }
}

#[async_trait]
impl ShellConnector for SshConnector {
    async fn open_shell(&self, request: &SessionRequest) -> Result<ShellHandles, SessionError> {
        let handle = tokio::time::timeout(self.connect_timeout, self.connect(request))
            .await
            .map_err(|_| SessionError::Timeout {
                host: request.host.clone(),
                timeout: self.connect_timeout,
            })??;

        let mut channel = match handle.channel_open_session().await {
            Ok(channel) => channel,
            Err(e) => {
                release_transport(&handle).await;
                return Err(SessionError::Channel(e.to_string()));
            }
        };

        let early_output = match self.start_shell(&mut channel, request.size).await {
            Ok(early_output) => early_output,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    tracing::debug!("Channel close after failed start: {}", close_err);
                }
                release_transport(&handle).await;
                return Err(e);
            }
        };

        tracing::debug!(
            "Shell started on {} ({} {})",
            request.host,
            self.term,
            request.size
        );

        let pipes = channel::spawn_driver(channel, early_output, request.host.clone());
        Ok(ShellHandles {
            input: Box::new(pipes.input),
            output: Box::new(pipes.output),
            control: Box::new(SshControl::new(handle, pipes.commands)),
        })
    }
}

/// Wait for the reply to a `want_reply` channel request
async fn await_reply(channel: &mut Channel<Msg>, early_output: &mut Vec<u8>) -> Result<(), String> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Ok(()),
            Some(ChannelMsg::Failure) => return Err("request refused by server".into()),
            Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                early_output.extend_from_slice(&data);
            }
            Some(ChannelMsg::Close) | Some(ChannelMsg::Eof) | None => {
                return Err("channel closed by server".into())
            }
            Some(_) => {}
        }
    }
}

/// Best-effort transport close on a construction failure path
async fn release_transport(handle: &Handle<GatewayClient>) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "session setup failed", "en")
        .await
    {
        tracing::debug!("Disconnect after failed setup: {}", e);
    }
}

/// russh client handler for gateway sessions
pub(super) struct GatewayClient {
    host: String,
}

#[async_trait]
impl client::Handler for GatewayClient {
    type Error = anyhow::Error;

    /// Accept the server's host key.
    ///
    /// Hosts are reached over the local network by address; no known-hosts
    /// store exists, so the fingerprint is only logged.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::info!(
            "Accepting host key for {}: {}",
            self.host,
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}
