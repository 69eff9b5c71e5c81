//! Core Socket struct, emission modes and lifecycle transitions.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::identifiers::{Namespace, SocketId};
use crate::protocol::{CONNECT, CONNECTION, DISCONNECT, Envelope};
use crate::transport::TransportRegistry;
use crate::transport::outbox::Outbox;

use super::handler::{self, HandlerTable};

/// Arguments of the local lifecycle dispatches.
const NO_ARGS: &[Value] = &[];

// ============================================================================
// SocketMode
// ============================================================================

/// How [`Socket::emit`] treats a new emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketMode {
    /// Not connected: emissions are queued until the transport opens.
    Buffering,
    /// Connected: emissions go straight to the transport.
    Direct,
}

// ============================================================================
// Types
// ============================================================================

/// Emission captured while buffering.
struct PendingEmission {
    event: String,
    args: Vec<Value>,
}

/// Mutable socket state, guarded by one lock.
struct SocketState {
    /// Current emission mode.
    mode: SocketMode,
    /// Registered event handlers.
    handlers: HandlerTable,
    /// Emissions waiting for the next open, oldest first.
    pending: VecDeque<PendingEmission>,
    /// Set once the socket has been closed.
    detached: bool,
}

/// Connection to the transport a socket is attached to.
struct SocketLink {
    /// Endpoint of the owning transport.
    endpoint: Url,
    /// Transport write side.
    outbox: Arc<Outbox>,
    /// Registry that owns the transport, for `close`.
    registry: Weak<TransportRegistry>,
}

/// Internal shared state for a socket.
struct SocketInner {
    /// Channel id sent with every envelope.
    id: SocketId,
    /// Namespace this socket is scoped to.
    namespace: Namespace,
    /// `None` for inert sockets.
    link: Option<SocketLink>,
    /// Mode, handlers and pending queue.
    state: Mutex<SocketState>,
}

// ============================================================================
// Socket
// ============================================================================

/// A namespace-scoped logical channel over a shared transport.
///
/// Handlers and emissions can be used right away. Until the transport
/// connects, emissions are buffered and flushed in order once it does; when
/// the connection drops the socket buffers again until the transport
/// reconnects.
///
/// Handles are cheap to clone and share state.
///
/// # Example
///
/// ```no_run
/// use serde_json::{Value, json};
/// use socket_mux::Client;
///
/// # async fn example() {
/// let client = Client::new();
/// let socket = client.open("localhost:8080/chat");
///
/// socket.on("message", |args: &[Value]| {
///     println!("got {args:?}");
/// });
/// socket.emit("message", vec![json!("hello")]);
/// # }
/// ```
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

// ============================================================================
// Socket - Display
// ============================================================================

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("namespace", &self.inner.namespace)
            .field("endpoint", &self.endpoint().map(Url::as_str))
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Socket - Constructors
// ============================================================================

impl Socket {
    /// Creates a buffering socket linked to a transport's write side.
    pub(crate) fn attached(
        namespace: Namespace,
        endpoint: Url,
        outbox: Arc<Outbox>,
        registry: Weak<TransportRegistry>,
    ) -> Self {
        Self::with_link(
            namespace,
            Some(SocketLink {
                endpoint,
                outbox,
                registry,
            }),
        )
    }

    /// Creates a socket with no transport.
    ///
    /// Every operation on it is a no-op.
    #[must_use]
    pub fn inert(namespace: Namespace) -> Self {
        Self::with_link(namespace, None)
    }

    fn with_link(namespace: Namespace, link: Option<SocketLink>) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                id: SocketId::generate(),
                namespace,
                link,
                state: Mutex::new(SocketState {
                    mode: SocketMode::Buffering,
                    handlers: HandlerTable::default(),
                    pending: VecDeque::new(),
                    detached: false,
                }),
            }),
        }
    }
}

// ============================================================================
// Socket - Accessors
// ============================================================================

impl Socket {
    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SocketId {
        &self.inner.id
    }

    /// Returns the namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    /// Returns the endpoint of the owning transport, `None` if inert.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.inner.link.as_ref().map(|link| &link.endpoint)
    }

    /// Returns the current emission mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> SocketMode {
        self.inner.state.lock().mode
    }

    /// Returns the number of buffered emissions.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Returns the number of events with a registered handler.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.state.lock().handlers.len()
    }

    /// Returns `true` if this socket has no transport.
    #[inline]
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inner.link.is_none()
    }

    /// Returns `true` once the socket has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().detached
    }

    /// Returns `true` if both handles refer to the same socket.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Socket - Handlers
// ============================================================================

impl Socket {
    /// Registers `handler` for `event`, replacing any previous handler.
    ///
    /// `"connect"` and `"disconnect"` handlers fire when the transport
    /// opens and closes. Events nobody registered for are dropped.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.register(event.into(), Arc::new(handler));
    }

    /// Registers a handler that receives its arguments decoded into `T`.
    ///
    /// The argument list is decoded as a JSON array, so a tuple type maps
    /// arguments by position. Frames whose arguments do not decode are
    /// logged and skipped.
    ///
    /// ```no_run
    /// # fn example(socket: &socket_mux::Socket) {
    /// socket.on_decoded("move", |(x, y): (i32, i32)| {
    ///     println!("moved to {x},{y}");
    /// });
    /// # }
    /// ```
    pub fn on_decoded<T, F>(&self, event: impl Into<String>, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let event = event.into();
        self.register(event.clone(), handler::decoded(event, handler));
    }

    /// Removes the handler for `event`. Returns `true` if one existed.
    pub fn off(&self, event: &str) -> bool {
        self.inner.state.lock().handlers.remove(event)
    }

    fn register(&self, event: String, handler: handler::Handler) {
        if self.is_inert() {
            return;
        }
        let replaced = self
            .inner
            .state
            .lock()
            .handlers
            .insert(event.clone(), handler);
        trace!(namespace = %self.inner.namespace, event = %event, replaced, "Handler registered");
    }
}

// ============================================================================
// Socket - Emission
// ============================================================================

impl Socket {
    /// Emits `event` with positional `args`.
    ///
    /// Sent immediately when connected, otherwise queued and sent in order
    /// after the next connect. Never fails: emissions on a closed or inert
    /// socket are dropped.
    pub fn emit(&self, event: impl Into<String>, args: Vec<Value>) {
        let Some(link) = &self.inner.link else {
            return;
        };
        let event = event.into();

        let mut state = self.inner.state.lock();
        if state.detached {
            debug!(namespace = %self.inner.namespace, event = %event, "Socket closed, emission dropped");
            return;
        }

        match state.mode {
            SocketMode::Buffering => {
                trace!(namespace = %self.inner.namespace, event = %event, "Emission buffered");
                state.pending.push_back(PendingEmission { event, args });
            }
            // Sent under the state lock so it cannot overtake a flush.
            SocketMode::Direct => self.send_now(link, event, args),
        }
    }

    /// Detaches the socket from its transport.
    ///
    /// Buffered emissions are discarded and no more frames are delivered.
    /// When this was the last socket on the transport, the connection is
    /// shut down.
    pub fn close(&self) {
        let Some(link) = &self.inner.link else {
            return;
        };
        match link.registry.upgrade() {
            Some(registry) => {
                registry.release(self);
            }
            None => self.mark_detached(),
        }
    }

    fn send_now(&self, link: &SocketLink, event: String, args: Vec<Value>) {
        let envelope = Envelope::outbound(
            self.inner.namespace.clone(),
            self.inner.id.clone(),
            event,
            args,
        );
        link.outbox.send(&envelope);
    }
}

// ============================================================================
// Socket - Transport Callbacks
// ============================================================================

impl Socket {
    /// Connect transition: switch to direct mode, announce the socket to the
    /// remote end, flush the queue, then run the local `connect` handler.
    ///
    /// No-op if already direct.
    pub(crate) fn handle_open(&self) {
        let Some(link) = &self.inner.link else {
            return;
        };

        let handler = {
            let mut state = self.inner.state.lock();
            if state.detached || state.mode == SocketMode::Direct {
                return;
            }
            state.mode = SocketMode::Direct;
            self.send_now(link, CONNECTION.to_string(), Vec::new());

            let flushed = state.pending.len();
            while let Some(pending) = state.pending.pop_front() {
                self.send_now(link, pending.event, pending.args);
            }

            debug!(namespace = %self.inner.namespace, flushed, "Socket connected");
            state.handlers.get(CONNECT)
        };

        if let Some(handler) = handler {
            handler(NO_ARGS);
        }
    }

    /// Disconnect transition: switch to buffering and run the local
    /// `disconnect` handler. The queue is kept.
    ///
    /// No-op if already buffering.
    pub(crate) fn handle_close(&self) {
        let handler = {
            let mut state = self.inner.state.lock();
            if state.mode == SocketMode::Buffering {
                return;
            }
            state.mode = SocketMode::Buffering;
            debug!(namespace = %self.inner.namespace, "Socket disconnected");
            state.handlers.get(DISCONNECT)
        };

        if let Some(handler) = handler {
            handler(NO_ARGS);
        }
    }

    /// Runs the handler registered for an inbound event, if any.
    pub(crate) fn dispatch(&self, event: &str, args: &[Value]) {
        let handler = self.inner.state.lock().handlers.get(event);
        match handler {
            Some(handler) => handler(args),
            None => trace!(namespace = %self.inner.namespace, event, "No handler, event dropped"),
        }
    }

    /// Marks the socket closed and drops its queue.
    pub(crate) fn mark_detached(&self) {
        let mut state = self.inner.state.lock();
        state.detached = true;
        state.mode = SocketMode::Buffering;
        let dropped = state.pending.len();
        state.pending.clear();
        if dropped > 0 {
            debug!(namespace = %self.inner.namespace, dropped, "Buffered emissions discarded on close");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn linked(namespace: &str) -> (Socket, UnboundedReceiver<String>) {
        let outbox = Arc::new(Outbox::default());
        let rx = outbox.open();
        let endpoint = Url::parse("ws://example.com/socket").expect("url");
        let socket = Socket::attached(Namespace::new(namespace), endpoint, outbox, Weak::new());
        (socket, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<Envelope> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(Envelope::decode(&frame).expect("decode"));
        }
        frames
    }

    fn events(frames: &[Envelope]) -> Vec<&str> {
        frames.iter().map(|e| e.event.as_str()).collect()
    }

    fn counter(socket: &Socket, event: &str) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&calls);
        socket.on(event, move |_: &[Value]| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        calls
    }

    #[test]
    fn test_new_socket_buffers() {
        let (socket, mut rx) = linked("/a");
        assert_eq!(socket.mode(), SocketMode::Buffering);

        socket.emit("greet", vec![json!("hi")]);

        assert_eq!(socket.pending_len(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_open_sends_connection_then_flushes_in_order() {
        let (socket, mut rx) = linked("/a");
        socket.emit("one", vec![json!(1)]);
        socket.emit("two", vec![json!(2)]);
        socket.emit("three", vec![]);

        socket.handle_open();

        let frames = drain(&mut rx);
        assert_eq!(events(&frames), ["connection", "one", "two", "three"]);
        assert_eq!(frames[1].args, vec![json!(1)]);
        assert!(frames.iter().all(|f| f.socket.as_ref() == Some(socket.id())));
        assert!(frames.iter().all(|f| f.namespace.as_str() == "/a"));
        assert_eq!(socket.mode(), SocketMode::Direct);
        assert_eq!(socket.pending_len(), 0);
    }

    #[test]
    fn test_direct_emit_sends_immediately() {
        let (socket, mut rx) = linked("/");
        socket.handle_open();
        drain(&mut rx);

        socket.emit("now", vec![json!(true)]);

        let frames = drain(&mut rx);
        assert_eq!(events(&frames), ["now"]);
        assert_eq!(socket.pending_len(), 0);
    }

    #[test]
    fn test_open_is_idempotent() {
        let (socket, mut rx) = linked("/");
        let connects = counter(&socket, "connect");

        socket.handle_open();
        socket.handle_open();

        assert_eq!(events(&drain(&mut rx)), ["connection"]);
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_fires_disconnect_once_and_rebuffers() {
        let (socket, mut rx) = linked("/");
        let disconnects = counter(&socket, "disconnect");
        socket.handle_open();
        drain(&mut rx);

        socket.handle_close();
        socket.handle_close();
        socket.emit("later", vec![]);

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(socket.mode(), SocketMode::Buffering);
        assert_eq!(socket.pending_len(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_close_before_open_is_silent() {
        let (socket, _rx) = linked("/");
        let disconnects = counter(&socket, "disconnect");

        socket.handle_close();

        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
        assert_eq!(socket.mode(), SocketMode::Buffering);
    }

    #[test]
    fn test_reconnect_cycle_flushes_again() {
        let (socket, mut rx) = linked("/");
        socket.handle_open();
        socket.handle_close();
        socket.emit("queued", vec![]);
        socket.handle_open();

        assert_eq!(
            events(&drain(&mut rx)),
            ["connection", "connection", "queued"]
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let (socket, _rx) = linked("/");
        let first = counter(&socket, "x");
        let second = counter(&socket, "x");

        socket.dispatch("x", &[]);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(socket.handler_count(), 1);
    }

    #[test]
    fn test_dispatch_passes_arguments() {
        let (socket, _rx) = linked("/");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        socket.on("x", move |args: &[Value]| sink.lock().extend_from_slice(args));

        socket.dispatch("x", &[json!(1), json!("two")]);

        assert_eq!(*seen.lock(), vec![json!(1), json!("two")]);
    }

    #[test]
    fn test_unknown_event_is_dropped() {
        let (socket, _rx) = linked("/");
        let calls = counter(&socket, "known");
        socket.dispatch("unknown", &[json!(1)]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_handler() {
        let (socket, _rx) = linked("/");
        let calls = counter(&socket, "x");

        assert!(socket.off("x"));
        assert!(!socket.off("x"));
        socket.dispatch("x", &[]);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_on_decoded() {
        let (socket, _rx) = linked("/");
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        socket.on_decoded("move", move |(x, y): (i32, i32)| {
            *sink.lock() = Some((x, y));
        });

        socket.dispatch("move", &[json!(3), json!(-4)]);

        assert_eq!(*seen.lock(), Some((3, -4)));
    }

    #[test]
    fn test_handler_can_emit_on_own_socket() {
        let (socket, mut rx) = linked("/");
        socket.handle_open();
        drain(&mut rx);

        let echo = socket.clone();
        socket.on("ping", move |args: &[Value]| echo.emit("pong", args.to_vec()));
        socket.dispatch("ping", &[json!(9)]);

        let frames = drain(&mut rx);
        assert_eq!(events(&frames), ["pong"]);
        assert_eq!(frames[0].args, vec![json!(9)]);
    }

    #[test]
    fn test_connect_handler_emissions_follow_flush() {
        let (socket, mut rx) = linked("/");
        let greeter = socket.clone();
        socket.on("connect", move |_: &[Value]| greeter.emit("hello", vec![]));
        socket.emit("buffered", vec![]);

        socket.handle_open();

        assert_eq!(
            events(&drain(&mut rx)),
            ["connection", "buffered", "hello"]
        );
    }

    #[test]
    fn test_detached_socket_drops_everything() {
        let (socket, mut rx) = linked("/");
        socket.emit("queued", vec![]);

        socket.mark_detached();
        socket.emit("dropped", vec![]);
        socket.handle_open();

        assert!(socket.is_closed());
        assert_eq!(socket.pending_len(), 0);
        assert_eq!(socket.mode(), SocketMode::Buffering);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_close_without_registry_detaches() {
        let (socket, _rx) = linked("/");
        socket.close();
        assert!(socket.is_closed());
    }

    #[test]
    fn test_inert_socket_is_noop() {
        let socket = Socket::inert(Namespace::root());
        socket.on("x", |_: &[Value]| {});
        socket.emit("x", vec![json!(1)]);
        socket.handle_open();
        socket.close();

        assert!(socket.is_inert());
        assert!(socket.endpoint().is_none());
        assert_eq!(socket.handler_count(), 0);
        assert_eq!(socket.pending_len(), 0);
        assert_eq!(socket.mode(), SocketMode::Buffering);
    }

    #[test]
    fn test_clones_share_state() {
        let (socket, _rx) = linked("/");
        let clone = socket.clone();
        clone.emit("x", vec![]);
        assert!(socket.ptr_eq(&clone));
        assert_eq!(socket.pending_len(), 1);
    }
}
