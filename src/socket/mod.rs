//! Namespace-scoped sockets.
//!
//! A [`Socket`] is the application-facing channel. It keeps a handler per
//! event name and, while its transport is disconnected, a queue of
//! emissions to flush on the next connect.
//!
//! # Modes
//!
//! | Mode | `emit` behavior |
//! |------|-----------------|
//! | [`SocketMode::Buffering`] | Queued until the transport opens |
//! | [`SocketMode::Direct`] | Written to the transport immediately |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Socket`] and its lifecycle transitions |
//! | `handler` | [`Handler`] type and the per-socket handler table |

// ============================================================================
// Submodules
// ============================================================================

/// Socket type and lifecycle transitions.
pub mod core;

/// Event handler table.
pub mod handler;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{Socket, SocketMode};
pub use handler::Handler;
