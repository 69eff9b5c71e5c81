//! Wire protocol.
//!
//! This module defines the single message shape exchanged with the remote
//! end and the event names the library reserves for itself.
//!
//! # Protocol Overview
//!
//! | Field | Direction | Purpose |
//! |-------|-----------|---------|
//! | `namespace` | both | Routes the frame to sockets of that namespace |
//! | `socket` | Local → Remote | Sender's channel id |
//! | `event` | both | Event name looked up in the handler table |
//! | `args` | both | Positional arguments |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | [`Envelope`] encode/decode |
//! | `event` | Reserved lifecycle event names |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope message type.
pub mod envelope;

/// Reserved event names.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use event::{CONNECT, CONNECTION, DISCONNECT};
