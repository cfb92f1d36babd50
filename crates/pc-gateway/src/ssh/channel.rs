//! Channel driver: exposes a russh shell channel as byte pipes

use async_trait::async_trait;
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, Mutex};

use pc_core::error::SessionError;
use pc_core::traits::ShellControl;
use pc_core::TerminalSize;

use super::connector::GatewayClient;

/// Buffer size of each in-memory pipe between the driver and the session
const PIPE_CAPACITY: usize = 16 * 1024;

/// Largest stdin chunk forwarded in one channel data message
const INPUT_CHUNK: usize = 4096;

/// Control commands queued to the driver
const COMMAND_CAPACITY: usize = 16;

/// Commands handled by the channel driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChannelCommand {
    /// Send a window-change request
    Resize(TerminalSize),
    /// Close the channel
    Close,
}

/// Session-facing ends of a driven channel
pub(super) struct DriverPipes {
    /// Shell stdin
    pub input: DuplexStream,
    /// Shell stdout and stderr
    pub output: DuplexStream,
    /// Command queue into the driver
    pub commands: mpsc::Sender<ChannelCommand>,
}

/// Start a driver task for `channel`.
///
/// `early_output` is delivered ahead of anything read from the channel.
pub(super) fn spawn_driver(channel: Channel<Msg>, early_output: Vec<u8>, host: String) -> DriverPipes {
    let (input, input_reader) = tokio::io::duplex(PIPE_CAPACITY);
    let (output_writer, output) = tokio::io::duplex(PIPE_CAPACITY);
    let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);

    tokio::spawn(drive(
        channel,
        input_reader,
        output_writer,
        command_rx,
        early_output,
        host,
    ));

    DriverPipes {
        input,
        output,
        commands,
    }
}

/// Multiplex stdin, control commands and channel messages until the channel
/// closes or the transport goes away.
///
/// The output pipe is shut down on exit so that its reader sees
/// end-of-stream.
async fn drive(
    mut channel: Channel<Msg>,
    mut input: DuplexStream,
    mut output: DuplexStream,
    mut commands: mpsc::Receiver<ChannelCommand>,
    early_output: Vec<u8>,
    host: String,
) {
    let mut output_open = output.write_all(&early_output).await.is_ok();
    let mut input_open = true;
    let mut buf = vec![0u8; INPUT_CHUNK];

    loop {
        tokio::select! {
            read = input.read(&mut buf), if input_open => match read {
                Ok(0) | Err(_) => {
                    input_open = false;
                    if let Err(e) = channel.eof().await {
                        tracing::debug!("{}: eof failed: {}", host, e);
                    }
                }
                Ok(n) => {
                    if let Err(e) = channel.data(&buf[..n]).await {
                        tracing::debug!("{}: channel write failed: {}", host, e);
                        break;
                    }
                }
            },

            command = commands.recv() => match command {
                Some(ChannelCommand::Resize(size)) => {
                    let result = channel
                        .window_change(u32::from(size.cols), u32::from(size.rows), 0, 0)
                        .await;
                    if let Err(e) = result {
                        tracing::debug!("{}: window change failed: {}", host, e);
                    }
                }
                Some(ChannelCommand::Close) | None => {
                    if let Err(e) = channel.close().await {
                        tracing::debug!("{}: channel close failed: {}", host, e);
                    }
                    break;
                }
            },

            message = channel.wait() => match message {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    if output_open && output.write_all(&data).await.is_err() {
                        tracing::debug!("{}: output reader gone, discarding shell output", host);
                        output_open = false;
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    tracing::debug!("{}: shell exited with status {}", host, exit_status);
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            },
        }
    }

    if let Err(e) = output.shutdown().await {
        tracing::trace!("{}: output shutdown: {}", host, e);
    }
    tracing::debug!("{}: channel driver finished", host);
}

/// [`ShellControl`] backed by the channel driver and the SSH transport
pub(super) struct SshControl {
    /// Transport; taken by the first disconnect
    handle: Mutex<Option<Handle<GatewayClient>>>,
    /// Driver command queue
    commands: mpsc::Sender<ChannelCommand>,
}

impl SshControl {
    pub(super) fn new(handle: Handle<GatewayClient>, commands: mpsc::Sender<ChannelCommand>) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
            commands,
        }
    }
}

#[async_trait]
impl ShellControl for SshControl {
    async fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        self.commands
            .send(ChannelCommand::Resize(size))
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn close_channel(&self) -> Result<(), SessionError> {
        match self.commands.try_send(ChannelCommand::Close) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SessionError::Transport(
                "channel command queue is full".into(),
            )),
        }
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let Some(handle) = self.handle.lock().await.take() else {
            return Ok(());
        };
        handle
            .disconnect(Disconnect::ByApplication, "session closed", "en")
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}
