//! In-process connector.
//!
//! [`MemoryConnector`] hands every successful connection attempt to a
//! [`MemoryListener`] as a [`MemoryPeer`], which plays the remote end:
//! it sees every frame the transport writes and can push frames back,
//! fail the connection, or drop it. Attempts can be refused on demand to
//! drive the reconnect path.
//!
//! # Example
//!
//! ```ignore
//! let (connector, mut listener) = MemoryConnector::pair();
//! let client = Client::builder().connector(connector).build()?;
//! let socket = client.open("example.com/chat");
//!
//! let mut peer = listener.accept().await.expect("transport connected");
//! let hello = peer.recv_envelope().await.expect("connection frame");
//! assert_eq!(hello.event, "connection");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::connector::{Connector, FrameSink, FrameStream};

// ============================================================================
// Types
// ============================================================================

/// Attempt bookkeeping shared between clones of a connector.
#[derive(Debug, Default)]
struct MemoryState {
    /// Number of upcoming attempts to refuse.
    refuse: usize,
    /// When each attempt happened, successful or not.
    attempts: Vec<Instant>,
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Connector whose connections are in-process channel pairs.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    /// Delivers accepted peers to the listener.
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
    /// Shared attempt state.
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Creates a connector and the listener receiving its connections.
    #[must_use]
    pub fn pair() -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let connector = Self {
            accept_tx,
            state: Arc::new(Mutex::new(MemoryState::default())),
        };
        (connector, MemoryListener { accept_rx })
    }

    /// Makes the next `count` connection attempts fail.
    pub fn refuse_next(&self, count: usize) {
        self.state.lock().refuse = count;
    }

    /// Returns the number of connection attempts so far.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts.len()
    }

    /// Returns the instant of every connection attempt so far.
    #[must_use]
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state.lock().attempts.clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, endpoint: &Url) -> Result<(FrameSink, FrameStream)> {
        {
            let mut state = self.state.lock();
            state.attempts.push(Instant::now());
            if state.refuse > 0 {
                state.refuse -= 1;
                debug!(endpoint = %endpoint, remaining = state.refuse, "Refusing memory connection");
                return Err(Error::connection("connection refused"));
            }
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Result<String>>();

        let peer = MemoryPeer {
            endpoint: endpoint.clone(),
            received: outbound_rx,
            inbound: inbound_tx,
        };
        self.accept_tx
            .send(peer)
            .map_err(|_| Error::connection("memory listener dropped"))?;

        let sink = sink::unfold(outbound_tx, |tx, frame: String| async move {
            tx.send(frame).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(tx)
        });

        let stream = stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

// ============================================================================
// MemoryListener
// ============================================================================

/// Receives the remote ends of connections made by a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    /// Waits for the next successful connection.
    ///
    /// Returns `None` once every connector clone has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Remote end of one in-memory connection.
///
/// Dropping the peer closes the connection from the remote side.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Endpoint the transport connected to.
    endpoint: Url,
    /// Frames written by the transport.
    received: mpsc::UnboundedReceiver<String>,
    /// Frames delivered to the transport.
    inbound: mpsc::UnboundedSender<Result<String>>,
}

impl MemoryPeer {
    /// Returns the endpoint this connection was opened for.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Waits for the next frame written by the transport.
    ///
    /// Returns `None` once the transport has dropped the connection.
    pub async fn recv(&mut self) -> Option<String> {
        self.received.recv().await
    }

    /// Waits for the next frame and decodes it.
    ///
    /// Returns `None` if the connection is gone or the frame is not an
    /// envelope.
    pub async fn recv_envelope(&mut self) -> Option<Envelope> {
        let frame = self.recv().await?;
        Envelope::decode(&frame).ok()
    }

    /// Returns a frame that is already queued, without waiting.
    #[must_use]
    pub fn try_recv(&mut self) -> Option<String> {
        self.received.try_recv().ok()
    }

    /// Delivers a raw text frame to the transport.
    ///
    /// Returns `false` if the transport has dropped the connection.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.inbound.send(Ok(frame.into())).is_ok()
    }

    /// Encodes and delivers an envelope to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the envelope cannot be encoded and
    /// [`Error::ConnectionClosed`] if the transport has dropped the
    /// connection.
    pub fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        let frame = envelope.encode()?;
        if self.send(frame) {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }

    /// Fails the connection with a read error.
    pub fn fail(self, error: Error) {
        let _ = self.inbound.send(Err(error));
    }

    /// Closes the connection from the remote side.
    pub fn close(self) {
        drop(self);
    }
}

// ============================================================================
// Tests
// ============================================================================
