//! Socket Mux - Namespace-multiplexed client sockets.
//!
//! This library lets an application open many logical, namespace-scoped
//! channels to a remote host over a single reconnecting duplex connection
//! per host.
//!
//! # Architecture
//!
//! The library follows a registry-transport-socket model:
//!
//! - **Client**: Parses destinations and owns the transport registry
//! - **Transport**: One physical connection per endpoint, driven by a Tokio
//!   task that reconnects with exponential backoff
//! - **Socket**: Namespace-scoped channel with named event handlers
//!
//! Key design principles:
//!
//! - Sockets for the same host share one [`Transport`]
//! - Emissions made while disconnected are buffered and flushed in order
//! - Inbound frames are routed by exact namespace match
//! - `open`, `on` and `emit` never fail; problems are logged and retried
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::{Value, json};
//! use socket_mux::Client;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new();
//!     let socket = client.open("localhost:8080/chat");
//!
//!     socket.on("connect", |_: &[Value]| println!("connected"));
//!     socket.on("message", |args: &[Value]| println!("message: {args:?}"));
//!
//!     // Buffered until the connection opens
//!     socket.emit("message", vec![json!("hello")]);
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] entry point and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe id and namespace wrappers |
//! | [`protocol`] | Wire envelope and reserved event names |
//! | [`socket`] | [`Socket`] channels and handlers |
//! | [`transport`] | Reconnecting transports and connectors |
//!
//! # Wire Format
//!
//! Every frame is one JSON text message:
//!
//! ```json
//! { "namespace": "/chat", "socket": "<id>", "event": "message", "args": ["hello"] }
//! ```

// ============================================================================
// Modules
// ============================================================================

/// Client entry point and configuration.
///
/// Use [`Client::new()`] or [`Client::builder()`] to create a client.
pub mod client;

/// Error types and result aliases.
///
/// Internal fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for channels and namespaces.
pub mod identifiers;

/// Wire protocol message types.
pub mod protocol;

/// Namespace-scoped sockets.
///
/// - [`Socket`] - Logical channel with event handlers
/// - [`SocketMode`] - Buffering or direct emission
pub mod socket;

/// Transport layer.
///
/// Connection management, reconnect backoff and the transport registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, Destination};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{Namespace, SocketId};

// Protocol types
pub use protocol::Envelope;

// Socket types
pub use socket::{Handler, Socket, SocketMode};

// Transport types
pub use transport::{
    Backoff, Connector, FrameSink, FrameStream, MemoryConnector, MemoryListener, MemoryPeer,
    Transport, TransportRegistry, TransportState, WsConnector,
};
