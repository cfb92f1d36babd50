//! WebSocket end-to-end tests
//!
//! Runs the real HTTP server on a loopback port with in-memory shells and
//! talks to it with a WebSocket client.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use pc_gateway::GatewayState;
use pc_protocol::{ClientMessage, MessageCodec, ServerMessage};

use common::{eventually, test_state, MockConnector, WAIT};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestGateway {
    addr: SocketAddr,
    cancel: CancellationToken,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn spawn_gateway(state: Arc<GatewayState>) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(pc_gateway::server::run(listener, state, cancel.clone()));
    TestGateway {
        addr,
        cancel,
        server,
    }
}

async fn connect(gateway: &TestGateway) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", gateway.addr))
        .await
        .expect("WebSocket handshake failed");
    ws
}

async fn send(ws: &mut Client, message: &ClientMessage) {
    let text = MessageCodec::new().encode_client(message).unwrap();
    ws.send(Message::Text(text)).await.unwrap();
}

async fn start_session(ws: &mut Client) {
    send(
        ws,
        &ClientMessage::StartSession {
            hostname: "10.0.0.5".into(),
            username: "pi".into(),
            password: "pw".into(),
            cols: Some(100),
            rows: Some(40),
        },
    )
    .await;
}

async fn next_server_message(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return MessageCodec::new().decode_server(&text).unwrap();
        }
    }
}

async fn expect_closed(ws: &mut Client) {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("server did not close the connection");
}

#[tokio::test]
async fn test_terminal_round_trip_over_websocket() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(Arc::clone(&state)).await;
    let mut ws = connect(&gateway).await;

    start_session(&mut ws).await;
    eventually(|| connector.opened() == 1).await;
    let shell = connector.shell(0);

    shell.emit(b"login banner\r\n").await;
    assert_eq!(
        next_server_message(&mut ws).await,
        ServerMessage::data("login banner\r\n")
    );

    send(&mut ws, &ClientMessage::Input { data: "uptime\r".into() }).await;
    assert_eq!(shell.read_input(7).await, b"uptime\r");

    send(&mut ws, &ClientMessage::Resize { cols: 120, rows: 50 }).await;
    eventually(|| shell.resizes().len() == 1).await;

    ws.close(None).await.unwrap();
    let registry = Arc::clone(&state.registry);
    eventually(|| registry.is_empty()).await;
    assert!(shell.disconnected());

    gateway.cancel.cancel();
}

#[tokio::test]
async fn test_start_ssh_alias_is_accepted() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(state).await;
    let mut ws = connect(&gateway).await;

    ws.send(Message::Text(
        r#"{"type":"start_ssh","hostname":"10.0.0.9","username":"pi","password":"pw"}"#.into(),
    ))
    .await
    .unwrap();

    eventually(|| connector.opened() == 1).await;
    assert_eq!(connector.shell(0).request.host, "10.0.0.9");

    gateway.cancel.cancel();
}

#[tokio::test]
async fn test_unknown_type_keeps_connection_open() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(Arc::clone(&state)).await;
    let mut ws = connect(&gateway).await;

    start_session(&mut ws).await;
    eventually(|| connector.opened() == 1).await;

    ws.send(Message::Text(r#"{"type":"heartbeat"}"#.into()))
        .await
        .unwrap();
    send(&mut ws, &ClientMessage::Input { data: "id\r".into() }).await;

    let shell = connector.shell(0);
    assert_eq!(shell.read_input(3).await, b"id\r");
    assert!(!shell.disconnected());
    assert_eq!(state.registry.len(), 1);

    gateway.cancel.cancel();
}

#[tokio::test]
async fn test_malformed_json_closes_connection() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(Arc::clone(&state)).await;
    let mut ws = connect(&gateway).await;

    start_session(&mut ws).await;
    eventually(|| connector.opened() == 1).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    expect_closed(&mut ws).await;

    let registry = Arc::clone(&state.registry);
    eventually(|| registry.is_empty()).await;
    assert!(connector.shell(0).disconnected());

    gateway.cancel.cancel();
}

#[tokio::test]
async fn test_binary_frame_closes_connection() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(state).await;
    let mut ws = connect(&gateway).await;

    ws.send(Message::Binary(vec![0x01, 0x02])).await.unwrap();
    expect_closed(&mut ws).await;

    gateway.cancel.cancel();
}

#[tokio::test]
async fn test_shutdown_tears_down_live_sessions() {
    let connector = MockConnector::new();
    let state = test_state(Arc::clone(&connector));
    let gateway = spawn_gateway(Arc::clone(&state)).await;
    let mut ws = connect(&gateway).await;

    start_session(&mut ws).await;
    eventually(|| connector.opened() == 1).await;
    let registry = Arc::clone(&state.registry);
    eventually(|| registry.len() == 1).await;

    gateway.cancel.cancel();
    timeout(WAIT, gateway.server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert!(state.registry.is_empty());
    assert!(connector.shell(0).disconnected());
}
