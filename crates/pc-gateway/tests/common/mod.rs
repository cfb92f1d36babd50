//! Shared test harness: in-memory shells and discovery sources

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use pc_core::config::GatewayConfig;
use pc_core::error::SessionError;
use pc_core::traits::{SessionRequest, ShellConnector, ShellControl, ShellHandles};
use pc_core::TerminalSize;
use pc_gateway::discovery::{AddressResolver, NeighborTable, Prober};
use pc_gateway::GatewayState;
use pc_protocol::ServerMessage;

/// Password the mock hosts refuse
pub const WRONG_PASSWORD: &str = "wrong";

/// How long any single wait in a test may take
pub const WAIT: Duration = Duration::from_secs(2);

/// Buffer size of each mock pipe direction
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Remote end of one mock shell
pub struct MockShell {
    /// Request the shell was opened with
    pub request: SessionRequest,
    /// Bytes written by the gateway to the shell's stdin
    stdin: tokio::sync::Mutex<DuplexStream>,
    /// Shell output; `None` once the shell or transport is gone
    stdout: tokio::sync::Mutex<Option<DuplexStream>>,
    resizes: Mutex<Vec<TerminalSize>>,
    close_channel_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    /// Close steps in the order the shell observed them
    events: Mutex<Vec<&'static str>>,
}

impl MockShell {
    /// Produce shell output
    pub async fn emit(&self, bytes: &[u8]) {
        let mut stdout = self.stdout.lock().await;
        let writer = stdout.as_mut().expect("shell output already closed");
        writer.write_all(bytes).await.unwrap();
    }

    /// Simulate the remote shell exiting
    pub async fn exit(&self) {
        self.stdout.lock().await.take();
    }

    /// Read exactly `len` bytes of stdin
    pub async fn read_input(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let mut stdin = self.stdin.lock().await;
        timeout(WAIT, stdin.read_exact(&mut buf))
            .await
            .expect("timed out waiting for shell input")
            .unwrap();
        buf
    }

    /// Assert nothing arrives on stdin for a short while
    pub async fn assert_no_input(&self) {
        let mut buf = [0u8; 1];
        let mut stdin = self.stdin.lock().await;
        let read = timeout(Duration::from_millis(100), stdin.read(&mut buf)).await;
        assert!(read.is_err(), "unexpected shell input");
    }

    /// Window changes received so far
    pub fn resizes(&self) -> Vec<TerminalSize> {
        self.resizes.lock().unwrap().clone()
    }

    pub fn channel_closed(&self) -> bool {
        self.close_channel_calls() > 0
    }

    pub fn disconnected(&self) -> bool {
        self.disconnect_calls() > 0
    }

    pub fn close_channel_calls(&self) -> usize {
        self.close_channel_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Close steps seen so far: `input_eof`, `close_channel`, `disconnect`
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }

    /// Whether stdin is already at end of file, without waiting
    fn input_at_eof(&self) -> bool {
        let Ok(mut stdin) = self.stdin.try_lock() else {
            return false;
        };
        let mut buf = [0u8; 1];
        matches!(stdin.read(&mut buf).now_or_never(), Some(Ok(0)))
    }
}

struct MockControl {
    shell: Arc<MockShell>,
}

#[async_trait]
impl ShellControl for MockControl {
    async fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        self.shell.resizes.lock().unwrap().push(size);
        Ok(())
    }

    async fn close_channel(&self) -> Result<(), SessionError> {
        if self.shell.input_at_eof() {
            self.shell.record("input_eof");
        }
        self.shell.close_channel_calls.fetch_add(1, Ordering::SeqCst);
        self.shell.record("close_channel");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.shell.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.shell.record("disconnect");
        self.shell.stdout.lock().await.take();
        Ok(())
    }
}

/// Shell connector whose hosts live in memory
#[derive(Default)]
pub struct MockConnector {
    shells: Mutex<Vec<Arc<MockShell>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of shells opened so far
    pub fn opened(&self) -> usize {
        self.shells.lock().unwrap().len()
    }

    /// The `index`th shell opened
    pub fn shell(&self, index: usize) -> Arc<MockShell> {
        Arc::clone(&self.shells.lock().unwrap()[index])
    }
}

#[async_trait]
impl ShellConnector for MockConnector {
    async fn open_shell(&self, request: &SessionRequest) -> Result<ShellHandles, SessionError> {
        if request.password == WRONG_PASSWORD {
            return Err(SessionError::AuthenticationRejected {
                user: request.username.clone(),
            });
        }

        let (input, stdin) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdout, output) = tokio::io::duplex(PIPE_CAPACITY);

        let shell = Arc::new(MockShell {
            request: request.clone(),
            stdin: tokio::sync::Mutex::new(stdin),
            stdout: tokio::sync::Mutex::new(Some(stdout)),
            resizes: Mutex::new(Vec::new()),
            close_channel_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        });
        self.shells.lock().unwrap().push(Arc::clone(&shell));

        Ok(ShellHandles {
            input: Box::new(input),
            output: Box::new(output),
            control: Box::new(MockControl { shell }),
        })
    }
}

/// Prober that does nothing
pub struct NoopProber;

#[async_trait]
impl Prober for NoopProber {
    async fn probe(&self, _addr: Ipv4Addr) {}
}

/// Neighbor table with fixed contents
pub struct StaticTable(pub Option<String>);

#[async_trait]
impl NeighborTable for StaticTable {
    async fn read(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Gateway state backed by `connector` and an empty neighbor table
pub fn test_state(connector: Arc<MockConnector>) -> Arc<GatewayState> {
    test_state_with_table(connector, None)
}

/// Gateway state backed by `connector` and the given neighbor table
pub fn test_state_with_table(connector: Arc<MockConnector>, table: Option<&str>) -> Arc<GatewayState> {
    let resolver = AddressResolver::with_sources(
        4,
        Arc::new(NoopProber),
        Arc::new(StaticTable(table.map(str::to_string))),
    );
    Arc::new(GatewayState::with_parts(
        GatewayConfig::default(),
        connector,
        resolver,
    ))
}

/// Receive the next outbound message
pub async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a server message")
        .expect("outbound queue closed")
}

/// Collect `ssh_data` text until it contains `needle`
pub async fn recv_data_until(rx: &mut mpsc::Receiver<ServerMessage>, needle: &str) -> String {
    let mut text = String::new();
    while !text.contains(needle) {
        match recv(rx).await {
            ServerMessage::SshData { data } => text.push_str(&data),
            other => panic!("expected ssh_data, got {:?}", other),
        }
    }
    text
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
