//! Wire envelope shared by both directions.
//!
//! Every frame on the connection is one JSON text message carrying a single
//! envelope.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};
use crate::identifiers::{Namespace, SocketId};

// ============================================================================
// Envelope
// ============================================================================

/// One event travelling between a socket and the remote end.
///
/// # Format
///
/// ```json
/// {
///   "namespace": "/chat/room1",
///   "socket": "q1w2e3...",
///   "event": "message",
///   "args": ["hello", 42]
/// }
/// ```
///
/// Inbound frames may omit `socket`. An empty, null or missing `namespace`
/// decodes as the root namespace `/`; missing or null `args` decode as an
/// empty list. `event` is required and must not be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Namespace the event belongs to.
    #[serde(default, deserialize_with = "namespace_or_root")]
    pub namespace: Namespace,

    /// Sending socket's id (outbound only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<SocketId>,

    /// Event name.
    pub event: String,

    /// Positional event arguments.
    #[serde(default, deserialize_with = "args_or_empty")]
    pub args: Vec<Value>,
}

impl Envelope {
    /// Creates an outbound envelope stamped with the sender's id.
    #[inline]
    #[must_use]
    pub fn outbound(
        namespace: Namespace,
        socket: SocketId,
        event: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            namespace,
            socket: Some(socket),
            event: event.into(),
            args,
        }
    }

    /// Creates an envelope without a sender id, as the remote end sends them.
    #[inline]
    #[must_use]
    pub fn inbound(namespace: Namespace, event: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            namespace,
            socket: None,
            event: event.into(),
            args,
        }
    }

    /// Serializes the envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if an argument cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Json`] if the frame is not a valid envelope
    /// - [`crate::Error::Protocol`] if the event name is empty
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Self = from_str(text)?;
        if envelope.event.is_empty() {
            return Err(Error::protocol("frame has an empty event name"));
        }
        Ok(envelope)
    }

    /// Decodes the argument at `index`.
    ///
    /// Returns `None` if the argument is missing or has the wrong shape.
    #[must_use]
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Option<T> {
        self.args
            .get(index)
            .and_then(|v| from_value(v.clone()).ok())
    }
}

// ============================================================================
// Field Decoders
// ============================================================================

fn namespace_or_root<'de, D>(deserializer: D) -> std::result::Result<Namespace, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(Namespace::new(raw.unwrap_or_default()))
}

fn args_or_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
