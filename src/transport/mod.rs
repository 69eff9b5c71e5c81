//! Transport layer.
//!
//! This module owns the physical connections sockets are multiplexed over.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Socket /chat   │──┐                           │                 │
//! │  Socket /news   │──┼──► Transport ◄───────────►│  Remote end     │
//! │  Socket /chat   │──┘    (one task)  Connector  │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `TransportRegistry::open` - Resolve or spawn the endpoint's transport
//! 2. `Transport` task connects through its `Connector`
//! 3. On open, attached sockets announce themselves and flush
//! 4. On close, sockets buffer again and the task waits out the backoff
//! 5. `TransportRegistry::release` - Last socket gone, transport shut down
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Exponential reconnect delay |
//! | `connector` | Duplex stream capability and WebSocket implementation |
//! | `core` | Transport handle and event loop |
//! | `memory` | In-process connector |
//! | `registry` | Endpoint-keyed transport registry |

// ============================================================================
// Submodules
// ============================================================================

/// Exponential reconnect delay.
pub mod backoff;

/// Duplex message-stream capability.
pub mod connector;

/// Transport handle and event loop.
pub mod core;

/// In-process connector.
pub mod memory;

/// Per-connection outbound channel.
pub(crate) mod outbox;

/// Endpoint-keyed transport registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{Backoff, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX};
pub use connector::{Connector, FrameSink, FrameStream, WsConnector};
pub use core::{Transport, TransportState};
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use registry::TransportRegistry;
