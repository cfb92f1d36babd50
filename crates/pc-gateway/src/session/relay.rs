//! Shell output relay

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use pc_core::traits::ShellOutput;
use pc_protocol::ServerMessage;

use super::BridgeSession;

/// Stream shell output to the client until end-of-stream, then tear down.
pub(super) async fn run(
    session: Arc<BridgeSession>,
    mut output: ShellOutput,
    outbound: mpsc::Sender<ServerMessage>,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut carry = Utf8Carry::new();
    let mut forwarded: u64 = 0;

    loop {
        let n = match output.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("{}: output read failed: {}", session.id(), e);
                break;
            }
        };

        forwarded += n as u64;
        let text = carry.decode(&buf[..n]);
        if text.is_empty() {
            continue;
        }
        if outbound.send(ServerMessage::data(text)).await.is_err() {
            tracing::debug!("{}: client writer gone, stopping relay", session.id());
            break;
        }
    }

    let rest = carry.finish();
    if !rest.is_empty() {
        let _ = outbound.send(ServerMessage::data(rest)).await;
    }

    tracing::debug!("{}: relay finished after {} bytes", session.id(), forwarded);
    session.teardown().await;
}

/// Decodes a byte stream into text chunk by chunk.
///
/// A UTF-8 sequence cut by a chunk boundary is held back and completed by
/// the next chunk. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, holding back a trailing incomplete sequence
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let complete = complete_prefix_len(&self.pending);
        let tail = self.pending.split_off(complete);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    /// Flush whatever is held back
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Length of `bytes` without a trailing incomplete UTF-8 sequence
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let start = len - back;
        let width = match bytes[start] {
            0x80..=0xBF => continue,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if back < width { start } else { len };
    }
    len
}
