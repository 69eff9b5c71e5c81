//! Loopback tests against a real WebSocket server.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use socket_mux::{Client, Envelope, Namespace, SocketMode};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use common::{WAIT, init_logging, next_call, record};

// ============================================================================
// Helpers
// ============================================================================

type ServerStream = WebSocketStream<TcpStream>;

/// Client with short backoff so reconnects happen quickly in real time.
fn fast_client() -> Result<Client> {
    init_logging();
    Ok(Client::builder()
        .backoff_base(Duration::from_millis(10))
        .backoff_max(Duration::from_millis(50))
        .build()?)
}

async fn accept(listener: &TcpListener) -> Result<ServerStream> {
    let (stream, _) = timeout(WAIT, listener.accept()).await??;
    Ok(accept_async(stream).await?)
}

async fn next_envelope(ws: &mut ServerStream) -> Result<Envelope> {
    loop {
        let message = timeout(WAIT, ws.next())
            .await?
            .context("client closed the connection")??;
        match message {
            Message::Text(text) => return Ok(Envelope::decode(text.as_str())?),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => bail!("unexpected message: {other:?}"),
        }
    }
}

async fn send_envelope(ws: &mut ServerStream, envelope: &Envelope) -> Result<()> {
    ws.send(Message::Text(envelope.encode()?.into())).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_round_trip_over_websocket() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let client = fast_client()?;
    let socket = client.try_open(&format!("127.0.0.1:{port}/chat"))?;
    let mut replies = record(&socket, "reply");
    socket.emit("greet", vec![json!("hi")]);

    let mut ws = accept(&listener).await?;

    let hello = next_envelope(&mut ws).await?;
    assert_eq!(hello.event, "connection");
    assert_eq!(hello.namespace.as_str(), "/chat");
    assert_eq!(hello.socket.as_ref(), Some(socket.id()));

    let greet = next_envelope(&mut ws).await?;
    assert_eq!(greet.event, "greet");
    assert_eq!(greet.args, vec![json!("hi")]);

    send_envelope(
        &mut ws,
        &Envelope::inbound(Namespace::new("/chat"), "reply", vec![json!("welcome")]),
    )
    .await?;
    assert_eq!(next_call(&mut replies).await, vec![json!("welcome")]);

    client.shutdown();
    Ok(())
}

#[tokio::test]
async fn test_server_close_triggers_reconnect() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let client = fast_client()?;
    let socket = client.open(&format!("127.0.0.1:{port}"));
    let mut disconnects = record(&socket, "disconnect");
    let mut connects = record(&socket, "connect");

    let mut ws = accept(&listener).await?;
    next_envelope(&mut ws).await?;
    next_call(&mut connects).await;

    ws.close(None).await?;
    drop(ws);

    next_call(&mut disconnects).await;
    assert_eq!(socket.mode(), SocketMode::Buffering);
    socket.emit("after", vec![json!(2)]);

    let mut ws = accept(&listener).await?;
    let hello = next_envelope(&mut ws).await?;
    let after = next_envelope(&mut ws).await?;

    assert_eq!(hello.event, "connection");
    assert_eq!(after.event, "after");
    next_call(&mut connects).await;
    assert!(disconnects.try_recv().is_err());

    client.shutdown();
    Ok(())
}

#[tokio::test]
async fn test_connects_once_server_appears() -> Result<()> {
    // Reserve a port, release it, and start listening only after the client
    // has failed a few attempts.
    let port = {
        let probe = TcpListener::bind("127.0.0.1:0").await?;
        probe.local_addr()?.port()
    };

    let client = fast_client()?;
    let socket = client.open(&format!("127.0.0.1:{port}/late"));
    socket.emit("queued", vec![]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let transport = client
        .transport(&format!("127.0.0.1:{port}"))
        .context("transport exists")?;
    assert_ne!(transport.state(), socket_mux::TransportState::Open);

    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        // Port taken by someone else in the meantime; nothing to test.
        Err(_) => return Ok(()),
    };

    let mut ws = accept(&listener).await?;
    assert_eq!(next_envelope(&mut ws).await?.event, "connection");
    assert_eq!(next_envelope(&mut ws).await?.event, "queued");

    client.shutdown();
    Ok(())
}
