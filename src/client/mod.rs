//! Client entry point and configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Opens sockets and owns their transports |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Endpoint and reconnect settings |
//! | [`Destination`] | Parsed `host/namespace` string |
//!
//! # Example
//!
//! ```no_run
//! use socket_mux::{Client, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder().scheme("wss").build()?;
//! let socket = client.open("example.com/chat");
//! socket.emit("join", vec![]);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Destination string parsing.
pub mod destination;

/// Endpoint and reconnect options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use destination::Destination;
pub use options::{ClientOptions, DEFAULT_SCHEME, DEFAULT_SOCKET_PATH};
