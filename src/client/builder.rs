//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use socket_mux::Client;
//!
//! # fn example() -> socket_mux::Result<()> {
//! let client = Client::builder()
//!     .scheme("wss")
//!     .backoff_max(Duration::from_secs(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::transport::{Connector, WsConnector};

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Endpoint and reconnect settings.
    options: ClientOptions,
    /// Connector override; `WsConnector` when unset.
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the endpoint scheme.
    ///
    /// # Arguments
    ///
    /// * `scheme` - URL scheme, usually "ws" or "wss"
    #[inline]
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.options.scheme = scheme.into();
        self
    }

    /// Sets the path appended to the host to form the endpoint.
    #[inline]
    #[must_use]
    pub fn socket_path(mut self, path: impl Into<String>) -> Self {
        self.options.socket_path = path.into();
        self
    }

    /// Sets the reconnect delay after a successful open.
    #[inline]
    #[must_use]
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.options.backoff_base = base;
        self
    }

    /// Sets the reconnect delay cap.
    #[inline]
    #[must_use]
    pub fn backoff_max(mut self, max: Duration) -> Self {
        self.options.backoff_max = max;
        self
    }

    /// Sets the connector used to open physical connections.
    ///
    /// # Arguments
    ///
    /// * `connector` - Any [`Connector`], e.g. a `MemoryConnector` in tests
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the options are
    /// invalid.
    pub fn build(self) -> Result<Client> {
        self.options.validate()?;

        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WsConnector::new()),
        };

        Ok(Client::with_parts(self.options, connector))
    }
}

// ============================================================================
// Tests
// ============================================================================
