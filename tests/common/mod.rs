//! Shared helpers for integration tests.
//!
//! Provides:
//! - Logging initialization
//! - Clients wired to an in-memory connector
//! - Bounded waits for peers, frames and handler calls

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use socket_mux::{Client, Envelope, MemoryConnector, MemoryListener, MemoryPeer, Socket};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single wait. Paused-clock tests advance through it
/// instantly, so it only has to exceed the longest backoff chain.
pub const WAIT: Duration = Duration::from_secs(300);

// ============================================================================
// Setup
// ============================================================================

/// Initialize tracing once per test binary. `RUST_LOG` overrides the filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("socket_mux=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Client backed by an in-memory connector with default options.
pub fn memory_client() -> (Client, MemoryConnector, MemoryListener) {
    init_logging();
    let (connector, listener) = MemoryConnector::pair();
    let client = Client::builder()
        .connector(connector.clone())
        .build()
        .expect("default options are valid");
    (client, connector, listener)
}

// ============================================================================
// Waits
// ============================================================================

/// Waits for the next connection.
pub async fn accept(listener: &mut MemoryListener) -> MemoryPeer {
    timeout(WAIT, listener.accept())
        .await
        .expect("connection in time")
        .expect("connector alive")
}

/// Waits for the next envelope written by the client.
pub async fn next_envelope(peer: &mut MemoryPeer) -> Envelope {
    timeout(WAIT, peer.recv_envelope())
        .await
        .expect("frame in time")
        .expect("valid envelope")
}

/// Waits for the next `count` envelopes and returns their event names.
pub async fn next_events(peer: &mut MemoryPeer, count: usize) -> Vec<String> {
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        events.push(next_envelope(peer).await.event);
    }
    events
}

// ============================================================================
// Handler Recording
// ============================================================================

/// Registers a handler for `event` that forwards its arguments.
pub fn record(socket: &Socket, event: &str) -> mpsc::UnboundedReceiver<Vec<Value>> {
    let (tx, rx) = mpsc::unbounded_channel();
    socket.on(event, move |args: &[Value]| {
        let _ = tx.send(args.to_vec());
    });
    rx
}

/// Waits for the next recorded handler call.
pub async fn next_call(rx: &mut mpsc::UnboundedReceiver<Vec<Value>>) -> Vec<Value> {
    timeout(WAIT, rx.recv())
        .await
        .expect("handler call in time")
        .expect("handler alive")
}
