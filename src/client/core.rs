//! Client entry point.
//!
//! The [`Client`] turns destination strings into sockets. It owns the
//! transport registry, so every socket it opens for one host shares one
//! connection.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::{Value, json};
//! use socket_mux::Client;
//!
//! # async fn example() {
//! let client = Client::new();
//!
//! let chat = client.open("localhost:8080/chat");
//! let news = client.open("localhost:8080/news");
//!
//! chat.on("message", |args: &[Value]| println!("chat: {args:?}"));
//! news.on("headline", |args: &[Value]| println!("news: {args:?}"));
//!
//! chat.emit("message", vec![json!("hello")]);
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::identifiers::Namespace;
use crate::socket::Socket;
use crate::transport::{Connector, Transport, TransportRegistry, WsConnector};

use super::builder::ClientBuilder;
use super::destination::Destination;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Endpoint and reconnect settings.
    options: ClientOptions,

    /// Transports by endpoint.
    registry: Arc<TransportRegistry>,
}

// ============================================================================
// Client
// ============================================================================

/// Entry point for opening namespace-scoped sockets.
///
/// Clones share the same registry. Dropping the last clone stops every
/// transport it created.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.inner.options)
            .field("transport_count", &self.transport_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a client with default options and the WebSocket connector.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(ClientOptions::default(), Arc::new(WsConnector::new()))
    }

    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Assembles a client from validated options.
    pub(crate) fn with_parts(options: ClientOptions, connector: Arc<dyn Connector>) -> Self {
        let registry = TransportRegistry::new(connector, options.backoff());
        Self {
            inner: Arc::new(ClientInner { options, registry }),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Opens a socket for `destination`.
    ///
    /// The socket is usable immediately: emissions are buffered until the
    /// host's transport connects. Never fails; if the destination cannot be
    /// parsed or no Tokio runtime is available, the returned socket is
    /// inert and every operation on it is a no-op. Use
    /// [`try_open`](Self::try_open) to see why.
    ///
    /// # Arguments
    ///
    /// * `destination` - `"<host>[/<segment>...]"`, e.g. `"example.com:8080/chat"`
    #[must_use]
    pub fn open(&self, destination: &str) -> Socket {
        match self.try_open(destination) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(destination, error = %e, "Returning inert socket");
                let namespace = Destination::parse(destination)
                    .map(Destination::into_namespace)
                    .unwrap_or_else(|_| Namespace::root());
                Socket::inert(namespace)
            }
        }
    }

    /// Opens a socket for `destination`, reporting why it could not be.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDestination`](crate::Error::InvalidDestination) if
    ///   the destination has no host or does not form a valid URL
    /// - [`Error::Unsupported`](crate::Error::Unsupported) if called outside
    ///   a Tokio runtime
    pub fn try_open(&self, destination: &str) -> Result<Socket> {
        let destination = Destination::parse(destination)?;
        let endpoint = destination.endpoint(&self.inner.options)?;

        let socket = self
            .inner
            .registry
            .open(&endpoint, destination.into_namespace())?;

        debug!(
            endpoint = %endpoint,
            namespace = %socket.namespace(),
            id = %socket.id(),
            "Socket opened"
        );

        Ok(socket)
    }

    /// Closes `socket`. Same as [`Socket::close`].
    ///
    /// Returns `true` if this shut down the socket's transport.
    pub fn close(&self, socket: &Socket) -> bool {
        self.inner.registry.release(socket)
    }

    /// Returns the transport serving `destination`'s host, if one is live.
    #[must_use]
    pub fn transport(&self, destination: &str) -> Option<Transport> {
        let endpoint = Destination::parse(destination)
            .and_then(|d| d.endpoint(&self.inner.options))
            .ok()?;
        self.inner.registry.get(&endpoint)
    }

    /// Returns the number of live transports.
    #[inline]
    #[must_use]
    pub fn transport_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Closes every socket and shuts down every transport.
    pub fn shutdown(&self) {
        self.inner.registry.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
