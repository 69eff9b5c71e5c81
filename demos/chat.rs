//! Two chat rooms over one connection.
//!
//! Demonstrates:
//! - Opening sockets for two namespaces on the same host
//! - Emitting before the connection is up (buffered, then flushed)
//! - Receiving events routed by namespace
//! - Reconnecting after the server drops the connection
//!
//! A small WebSocket server runs in-process and echoes every event back to
//! the namespace it came from, prefixed with the room name.
//!
//! Usage:
//!   cargo run --example chat
//!   cargo run --example chat -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use socket_mux::{Client, Envelope, Result};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Chat: two rooms, one connection ===\n");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| socket_mux::Error::connection(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| socket_mux::Error::connection(e.to_string()))?
        .port();
    tokio::spawn(serve(listener));

    let client = Client::builder()
        .backoff_base(Duration::from_millis(250))
        .build()?;

    let general = client.try_open(&format!("127.0.0.1:{port}/rooms/general"))?;
    let random = client.try_open(&format!("127.0.0.1:{port}/rooms/random"))?;

    for socket in [&general, &random] {
        let room = socket.namespace().to_string();
        let on_connect = room.clone();
        let on_disconnect = room.clone();
        socket.on("connect", move |_: &[Value]| println!("[{on_connect}] connected"));
        socket.on("disconnect", move |_: &[Value]| {
            println!("[{on_disconnect}] disconnected");
        });
        socket.on_decoded("message", move |(text,): (String,)| {
            println!("[{room}] {text}");
        });
    }

    // Queued until the transport connects
    general.emit("message", vec![json!("hello from general")]);
    random.emit("message", vec![json!("hello from random")]);

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Ask the server to drop the connection; both rooms reconnect together.
    general.emit("drop", vec![]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    general.emit("message", vec![json!("sent while reconnecting")]);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let transport = client
        .transport(&format!("127.0.0.1:{port}"))
        .map(|t| format!("{t:?}"))
        .unwrap_or_default();
    println!("\n{transport}");

    client.shutdown();
    println!("\n=== Done ===");
    Ok(())
}

// ============================================================================
// Server
// ============================================================================

/// Accepts connections forever, echoing `message` events and closing the
/// connection on `drop`.
async fn serve(listener: TcpListener) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };

            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let Ok(envelope) = Envelope::decode(text.as_str()) else {
                    continue;
                };

                match envelope.event.as_str() {
                    "drop" => break,
                    "message" => {
                        let text = envelope.arg::<String>(0).unwrap_or_default();
                        let reply = Envelope::inbound(
                            envelope.namespace.clone(),
                            "message",
                            vec![json!(format!("echo: {text}"))],
                        );
                        let Ok(frame) = reply.encode() else {
                            continue;
                        };
                        if ws.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        });
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "socket_mux=debug"
    } else {
        "socket_mux=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
