//! Reconnecting transport and its event loop.
//!
//! A [`Transport`] owns one physical connection to an endpoint and the
//! sockets multiplexed over it.
//!
//! # Event Loop
//!
//! Spawning a transport starts one Tokio task that owns the connection
//! and the backoff state. The task:
//!
//! - Connects through the [`Connector`], retrying forever with backoff
//! - Switches every attached socket to direct mode when a connection opens
//! - Routes inbound frames to sockets by exact namespace match
//! - Writes frames queued by sockets to the connection
//! - Switches sockets back to buffering when the connection closes
//!
//! Every open/close transition and every inbound dispatch for one
//! transport runs on this task, so they are totally ordered.
//!
//! # State Machine
//!
//! ```text
//!            ┌──────────── open fails ─────────────┐
//!            ▼                                     │
//!   ┌──────────────┐   opened   ┌──────┐  closed  ┌┴────────┐
//!   │  Connecting  ├───────────►│ Open ├─────────►│ Waiting │
//!   └──────────────┘            └──────┘          └────┬────┘
//!            ▲                                         │
//!            └──────────── backoff elapsed ────────────┘
//!
//!   shutdown from any state ──► Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Envelope;
use crate::socket::Socket;

use super::backoff::Backoff;
use super::connector::{Connector, FrameSink, FrameStream};
use super::outbox::Outbox;

// ============================================================================
// TransportState
// ============================================================================

/// Observable lifecycle state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open.
    Open,
    /// Waiting for the backoff delay before the next attempt.
    Waiting,
    /// The event loop has stopped.
    Closed,
}

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
enum TransportCommand {
    /// A socket joined the attached set.
    Attached(Socket),
    /// Stop the event loop.
    Shutdown,
}

/// How a connected session ended.
enum SessionEnd {
    /// Connection dropped; reconnect.
    Closed,
    /// Shutdown requested; stop.
    Shutdown,
}

// ============================================================================
// TransportShared
// ============================================================================

/// State shared between transport handles and the event loop.
struct TransportShared {
    /// Endpoint URL, also the registry key.
    endpoint: Url,
    /// Attached sockets in attach order.
    sockets: Mutex<Vec<Socket>>,
    /// Write side handed to sockets.
    outbox: Arc<Outbox>,
    /// Current lifecycle state.
    state: Mutex<TransportState>,
    /// Current backoff delay.
    backoff: Mutex<Duration>,
}

impl TransportShared {
    fn set_state(&self, state: TransportState) {
        *self.state.lock() = state;
    }

    fn set_backoff(&self, delay: Duration) {
        *self.backoff.lock() = delay;
    }

    /// Clones the attached set so no lock is held while sockets run
    /// handlers.
    fn snapshot(&self) -> Vec<Socket> {
        self.sockets.lock().clone()
    }

    /// Routes one inbound text frame.
    fn dispatch(&self, frame: &str) {
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Failed to parse incoming frame");
                return;
            }
        };

        trace!(
            namespace = %envelope.namespace,
            event = %envelope.event,
            "Frame received"
        );

        for socket in self.snapshot() {
            if *socket.namespace() == envelope.namespace {
                socket.dispatch(&envelope.event, &envelope.args);
            }
        }
    }

    /// Ends the current connection and moves every socket to buffering.
    fn handle_close(&self) {
        self.outbox.close();
        for socket in self.snapshot() {
            socket.handle_close();
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Handle to a reconnecting connection shared by many sockets.
///
/// Handles are cheap to clone. The event loop stops when the registry
/// evicts the transport or once every handle has been dropped.
#[derive(Clone)]
pub struct Transport {
    /// State shared with the event loop.
    shared: Arc<TransportShared>,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.shared.endpoint.as_str())
            .field("state", &self.state())
            .field("sockets", &self.socket_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport - Constructor
// ============================================================================

impl Transport {
    /// Creates a transport and starts connecting immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if called outside a Tokio runtime.
    pub fn spawn(endpoint: Url, connector: Arc<dyn Connector>, backoff: Backoff) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|_| Error::unsupported("no Tokio runtime to drive the transport"))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(TransportShared {
            endpoint,
            sockets: Mutex::new(Vec::new()),
            outbox: Arc::new(Outbox::default()),
            state: Mutex::new(TransportState::Connecting),
            backoff: Mutex::new(backoff.current()),
        });

        handle.spawn(Self::run_event_loop(
            Arc::clone(&shared),
            connector,
            backoff,
            command_rx,
        ));

        debug!(endpoint = %shared.endpoint, "Transport spawned");

        Ok(Self { shared, command_tx })
    }
}

// ============================================================================
// Transport - Public API
// ============================================================================

impl Transport {
    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TransportState {
        *self.shared.state.lock()
    }

    /// Returns the current backoff delay.
    #[inline]
    #[must_use]
    pub fn backoff_duration(&self) -> Duration {
        *self.shared.backoff.lock()
    }

    /// Returns the number of attached sockets.
    #[inline]
    #[must_use]
    pub fn socket_count(&self) -> usize {
        self.shared.sockets.lock().len()
    }

    /// Returns `true` if both handles drive the same connection.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Sends an event on behalf of `socket`.
    ///
    /// Best effort: the frame is dropped if the connection is not open.
    /// A failed write shows up only as the following close.
    pub fn send(&self, socket: &Socket, event: impl Into<String>, args: Vec<Value>) {
        let envelope = Envelope::outbound(
            socket.namespace().clone(),
            socket.id().clone(),
            event,
            args,
        );
        self.shared.outbox.send(&envelope);
    }
}

// ============================================================================
// Transport - Internal API
// ============================================================================

impl Transport {
    /// Returns the write side sockets emit through.
    pub(crate) fn outbox(&self) -> Arc<Outbox> {
        Arc::clone(&self.shared.outbox)
    }

    /// Adds a socket to the attached set.
    ///
    /// If the connection is already open the event loop switches the socket
    /// to direct mode right away.
    pub(crate) fn attach(&self, socket: Socket) {
        self.shared.sockets.lock().push(socket.clone());
        trace!(
            endpoint = %self.shared.endpoint,
            namespace = %socket.namespace(),
            "Socket attached"
        );
        let _ = self.command_tx.send(TransportCommand::Attached(socket));
    }

    /// Removes a socket from the attached set and marks it detached.
    ///
    /// Returns the number of sockets still attached.
    pub(crate) fn detach(&self, socket: &Socket) -> usize {
        let remaining = {
            let mut sockets = self.shared.sockets.lock();
            sockets.retain(|s| !s.ptr_eq(socket));
            sockets.len()
        };
        socket.mark_detached();
        debug!(
            endpoint = %self.shared.endpoint,
            namespace = %socket.namespace(),
            remaining,
            "Socket detached"
        );
        remaining
    }

    /// Stops the event loop and closes the connection.
    ///
    /// Only the registry stops transports, after removing them, so a
    /// registered transport always keeps reconnecting.
    pub(crate) fn shutdown(&self) {
        let _ = self.command_tx.send(TransportCommand::Shutdown);
    }

    /// Detaches every socket.
    pub(crate) fn detach_all(&self) {
        let sockets: Vec<Socket> = self.shared.sockets.lock().drain(..).collect();
        for socket in sockets {
            socket.mark_detached();
        }
    }
}

// ============================================================================
// Transport - Event Loop
// ============================================================================

impl Transport {
    /// Connect/open/close/reconnect loop.
    async fn run_event_loop(
        shared: Arc<TransportShared>,
        connector: Arc<dyn Connector>,
        mut backoff: Backoff,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
    ) {
        debug!(endpoint = %shared.endpoint, "Event loop started");

        loop {
            shared.set_state(TransportState::Connecting);

            // Keep serving commands while the attempt is in flight.
            let mut attempt = connector.connect(&shared.endpoint);
            let outcome = loop {
                tokio::select! {
                    result = &mut attempt => break result,

                    command = command_rx.recv() => match command {
                        // Picked up by the open transition.
                        Some(TransportCommand::Attached(_)) => {}
                        Some(TransportCommand::Shutdown) | None => {
                            Self::finish(&shared);
                            return;
                        }
                    }
                }
            };
            drop(attempt);

            match outcome {
                Ok((sink, stream)) => {
                    backoff.reset();
                    shared.set_backoff(backoff.current());
                    info!(endpoint = %shared.endpoint, "Transport connected");

                    let end = Self::run_session(&shared, sink, stream, &mut command_rx).await;
                    if let SessionEnd::Shutdown = end {
                        Self::finish(&shared);
                        return;
                    }
                    info!(endpoint = %shared.endpoint, "Transport disconnected");
                }
                Err(e) => {
                    warn!(endpoint = %shared.endpoint, error = %e, "Connection attempt failed");
                }
            }

            shared.handle_close();

            let delay = backoff.advance();
            shared.set_backoff(delay);
            shared.set_state(TransportState::Waiting);
            debug!(
                endpoint = %shared.endpoint,
                delay_ms = delay.as_millis() as u64,
                "Reconnect scheduled"
            );

            let timer = sleep(delay);
            tokio::pin!(timer);
            loop {
                tokio::select! {
                    () = &mut timer => break,

                    command = command_rx.recv() => match command {
                        Some(TransportCommand::Attached(_)) => {}
                        Some(TransportCommand::Shutdown) | None => {
                            Self::finish(&shared);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Serves one open connection until it closes or shutdown is requested.
    async fn run_session(
        shared: &TransportShared,
        mut sink: FrameSink,
        mut stream: FrameStream,
        command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
    ) -> SessionEnd {
        let mut outbound = shared.outbox.open();
        shared.set_state(TransportState::Open);

        for socket in shared.snapshot() {
            socket.handle_open();
        }

        loop {
            tokio::select! {
                // Incoming frames from the remote end
                frame = stream.next() => match frame {
                    Some(Ok(text)) => shared.dispatch(&text),

                    Some(Err(e)) => {
                        debug!(endpoint = %shared.endpoint, error = %e, "Connection read failed");
                        return SessionEnd::Closed;
                    }

                    None => {
                        debug!(endpoint = %shared.endpoint, "Connection stream ended");
                        return SessionEnd::Closed;
                    }
                },

                // Frames queued by sockets
                Some(frame) = outbound.recv() => {
                    if let Err(e) = sink.send(frame).await {
                        debug!(endpoint = %shared.endpoint, error = %e, "Connection write failed");
                        return SessionEnd::Closed;
                    }
                    trace!(endpoint = %shared.endpoint, "Frame sent");
                }

                // Commands from handles
                command = command_rx.recv() => match command {
                    Some(TransportCommand::Attached(socket)) => socket.handle_open(),

                    Some(TransportCommand::Shutdown) | None => {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                }
            }
        }
    }

    /// Final cleanup when the event loop stops.
    fn finish(shared: &TransportShared) {
        shared.handle_close();
        shared.set_state(TransportState::Closed);
        info!(endpoint = %shared.endpoint, "Transport shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================
