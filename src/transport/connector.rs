//! Duplex message-stream capability.
//!
//! A [`Connector`] turns an endpoint URL into a pair of text-frame halves.
//! The transport only needs open, message, close and send semantics, so any
//! message-oriented duplex stream can sit behind this trait.
//!
//! # Implementations
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WsConnector`] | WebSocket client over `tokio-tungstenite` |
//! | [`MemoryConnector`](super::MemoryConnector) | In-process channels, for tests and embedding |

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::future;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Write half of a connection. Each item is one text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Read half of a connection.
///
/// Yields one item per text frame. An `Err` item or the end of the stream
/// means the connection is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Connector
// ============================================================================

/// Opens physical connections for a transport.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to `endpoint`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a failed attempt and retried with backoff.
    async fn connect(&self, endpoint: &Url) -> Result<(FrameSink, FrameStream)>;
}

// ============================================================================
// WsConnector
// ============================================================================

/// WebSocket connector backed by `tokio-tungstenite`.
///
/// Text and UTF-8 binary messages become frames; ping/pong are handled by
/// tungstenite and skipped; a close message ends the stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a WebSocket connector.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url) -> Result<(FrameSink, FrameStream)> {
        let (ws_stream, response) = connect_async(endpoint.as_str()).await?;
        debug!(endpoint = %endpoint, status = %response.status(), "WebSocket handshake completed");

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(Error::from)
            .with(|frame: String| future::ready(Ok::<_, Error>(Message::Text(frame.into()))));

        let stream = ws_read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok().map(Ok),
                Ok(Message::Close(_)) => Some(Err(Error::ConnectionClosed)),
                // Ping, Pong, raw frames
                Ok(_) => None,
                Err(e) => Some(Err(Error::from(e))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

// ============================================================================
// Tests
// ============================================================================
