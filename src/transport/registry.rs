//! Transport registry keyed by endpoint.
//!
//! Every socket opened for the same endpoint shares one [`Transport`].
//! The registry creates transports on first use and evicts them once their
//! last socket is released.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              TransportRegistry               │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ ws://a.example/socket → Transport 1    │  │
//! │  │     sockets: /chat, /chat, /news       │  │
//! │  │ ws://b.example/socket → Transport 2    │  │
//! │  │     sockets: /                         │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::identifiers::Namespace;
use crate::socket::Socket;

use super::backoff::Backoff;
use super::connector::Connector;
use super::core::{Transport, TransportState};

// ============================================================================
// TransportRegistry
// ============================================================================

/// Owns the transports of one client, one per endpoint.
///
/// Lookup-or-create and release run under a single lock, so two opens for
/// the same endpoint never create two transports and a release never races
/// an attach into an evicted transport.
pub struct TransportRegistry {
    /// Opens physical connections for new transports.
    connector: Arc<dyn Connector>,

    /// Backoff settings copied into each new transport.
    backoff: Backoff,

    /// Live transports by endpoint URL.
    transports: Mutex<FxHashMap<String, Transport>>,
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("backoff", &self.backoff)
            .field("transports", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TransportRegistry - Constructor
// ============================================================================

impl TransportRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, backoff: Backoff) -> Arc<Self> {
        Arc::new(Self {
            connector,
            backoff,
            transports: Mutex::new(FxHashMap::default()),
        })
    }
}

// ============================================================================
// TransportRegistry - Public API
// ============================================================================

impl TransportRegistry {
    /// Returns the transport for `endpoint`, creating it if needed.
    ///
    /// A new transport starts connecting right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`](crate::Error::Unsupported) if a new
    /// transport is needed and there is no Tokio runtime.
    pub fn resolve(&self, endpoint: &Url) -> Result<Transport> {
        let mut transports = self.transports.lock();
        self.resolve_locked(&mut transports, endpoint)
    }

    /// Creates a socket on the transport for `endpoint` and attaches it.
    ///
    /// The socket starts out buffering.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn open(self: &Arc<Self>, endpoint: &Url, namespace: Namespace) -> Result<Socket> {
        let mut transports = self.transports.lock();
        let transport = self.resolve_locked(&mut transports, endpoint)?;

        let socket = Socket::attached(
            namespace,
            transport.endpoint().clone(),
            transport.outbox(),
            Arc::downgrade(self),
        );
        transport.attach(socket.clone());

        Ok(socket)
    }

    /// Detaches `socket` from its transport.
    ///
    /// When it was the last socket, the transport is shut down and removed.
    /// Returns `true` if that happened.
    pub fn release(&self, socket: &Socket) -> bool {
        let Some(endpoint) = socket.endpoint() else {
            return false;
        };

        let mut transports = self.transports.lock();
        let Some(transport) = transports.get(endpoint.as_str()) else {
            socket.mark_detached();
            return false;
        };

        if transport.detach(socket) > 0 {
            return false;
        }

        if let Some(transport) = transports.remove(endpoint.as_str()) {
            transport.shutdown();
            info!(endpoint = %endpoint, "Transport evicted");
        }
        true
    }

    /// Returns the transport for `endpoint`, if one exists.
    #[must_use]
    pub fn get(&self, endpoint: &Url) -> Option<Transport> {
        self.transports.lock().get(endpoint.as_str()).cloned()
    }

    /// Returns the number of live transports.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transports.lock().len()
    }

    /// Returns `true` if there are no live transports.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.lock().is_empty()
    }

    /// Detaches every socket and shuts down every transport.
    pub fn shutdown(&self) {
        let transports: Vec<_> = self.transports.lock().drain().collect();
        if transports.is_empty() {
            return;
        }

        info!(count = transports.len(), "Registry shutting down");
        for (endpoint, transport) in transports {
            transport.detach_all();
            transport.shutdown();
            debug!(endpoint = %endpoint, "Transport closed during shutdown");
        }
    }
}

// ============================================================================
// TransportRegistry - Internal
// ============================================================================

impl TransportRegistry {
    fn resolve_locked(
        &self,
        transports: &mut FxHashMap<String, Transport>,
        endpoint: &Url,
    ) -> Result<Transport> {
        if let Some(transport) = transports.get(endpoint.as_str()) {
            if transport.state() != TransportState::Closed {
                return Ok(transport.clone());
            }

            // A stopped loop never reconnects.
            warn!(endpoint = %endpoint, "Replacing stopped transport");
            transport.detach_all();
        }

        let transport = Transport::spawn(
            endpoint.clone(),
            Arc::clone(&self.connector),
            self.backoff,
        )?;
        transports.insert(endpoint.as_str().to_owned(), transport.clone());
        debug!(endpoint = %endpoint, "Transport created");

        Ok(transport)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    use crate::error::Error;
    use crate::transport::{MemoryConnector, MemoryListener};

    const WAIT: Duration = Duration::from_secs(5);

    fn registry() -> (Arc<TransportRegistry>, MemoryListener) {
        let (connector, listener) = MemoryConnector::pair();
        (
            TransportRegistry::new(Arc::new(connector), Backoff::default()),
            listener,
        )
    }

    fn url(host: &str) -> Url {
        Url::parse(&format!("ws://{host}/socket")).expect("url")
    }

    #[tokio::test]
    async fn test_same_endpoint_shares_transport() {
        let (registry, _listener) = registry();

        let a = registry.resolve(&url("one")).expect("resolve");
        let b = registry.resolve(&url("one")).expect("resolve");

        assert!(a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_different_endpoints_get_distinct_transports() {
        let (registry, _listener) = registry();

        let a = registry.resolve(&url("one")).expect("resolve");
        let b = registry.resolve(&url("two")).expect("resolve");

        assert!(!a.ptr_eq(&b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_open_attaches_socket() {
        let (registry, _listener) = registry();

        let socket = registry
            .open(&url("one"), Namespace::new("/chat"))
            .expect("open");
        let transport = registry.get(&url("one")).expect("transport");

        assert_eq!(transport.socket_count(), 1);
        assert_eq!(socket.endpoint(), Some(transport.endpoint()));
        assert_eq!(socket.namespace().as_str(), "/chat");
    }

    #[tokio::test]
    async fn test_release_last_socket_evicts() {
        let (registry, _listener) = registry();
        let a = registry.open(&url("one"), Namespace::root()).expect("open");
        let b = registry.open(&url("one"), Namespace::root()).expect("open");
        let transport = registry.get(&url("one")).expect("transport");

        assert!(!registry.release(&a));
        assert_eq!(registry.len(), 1);
        assert!(registry.release(&b));
        assert!(registry.is_empty());

        timeout(WAIT, async {
            while transport.state() != TransportState::Closed {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("transport closes");
    }

    #[tokio::test]
    async fn test_open_after_eviction_creates_new_transport() {
        let (registry, _listener) = registry();
        let first = registry.open(&url("one"), Namespace::root()).expect("open");
        let old = registry.get(&url("one")).expect("transport");
        registry.release(&first);

        registry.open(&url("one"), Namespace::root()).expect("open");
        let new = registry.get(&url("one")).expect("transport");

        assert!(!old.ptr_eq(&new));
    }

    #[tokio::test]
    async fn test_resolve_replaces_stopped_transport() {
        let (registry, mut listener) = registry();
        let stale = registry.open(&url("one"), Namespace::root()).expect("open");
        let old = registry.get(&url("one")).expect("transport");
        let _peer = timeout(WAIT, listener.accept())
            .await
            .expect("in time")
            .expect("first connection");

        old.shutdown();
        timeout(WAIT, async {
            while old.state() != TransportState::Closed {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("transport closes");

        let fresh = registry.open(&url("one"), Namespace::root()).expect("open");
        let new = registry.get(&url("one")).expect("transport");

        assert!(!old.ptr_eq(&new));
        assert!(stale.is_closed());
        assert!(!fresh.is_closed());
        assert_eq!(registry.len(), 1);
        assert_eq!(new.socket_count(), 1);
        timeout(WAIT, listener.accept())
            .await
            .expect("in time")
            .expect("reconnects on the new transport");
    }

    #[tokio::test]
    async fn test_socket_close_goes_through_registry() {
        let (registry, _listener) = registry();
        let socket = registry.open(&url("one"), Namespace::root()).expect("open");

        socket.close();

        assert!(socket.is_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_release_unknown_socket_detaches_it() {
        let (registry, _listener) = registry();
        let socket = registry.open(&url("one"), Namespace::root()).expect("open");
        registry.shutdown();

        assert!(!registry.release(&socket));
        assert!(socket.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_detaches_everything() {
        let (registry, _listener) = registry();
        let a = registry.open(&url("one"), Namespace::root()).expect("open");
        let b = registry.open(&url("two"), Namespace::root()).expect("open");

        registry.shutdown();

        assert!(registry.is_empty());
        assert!(a.is_closed());
        assert!(b.is_closed());
    }

    #[test]
    fn test_resolve_without_runtime_is_unsupported() {
        let (registry, _listener) = registry();
        let result = registry.resolve(&url("one"));
        assert!(matches!(result, Err(Error::Unsupported { .. })));
        assert!(registry.is_empty());
    }
}
