//! Client configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use socket_mux::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_scheme("wss")
//!     .with_backoff(Duration::from_millis(500), Duration::from_secs(10));
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Backoff, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX};

// ============================================================================
// Constants
// ============================================================================

/// Default endpoint scheme.
pub const DEFAULT_SCHEME: &str = "ws";

/// Default endpoint path.
pub const DEFAULT_SOCKET_PATH: &str = "/socket";

// ============================================================================
// ClientOptions
// ============================================================================

/// Endpoint and reconnect settings shared by every transport of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// URL scheme of transport endpoints.
    pub scheme: String,

    /// Path appended to the host to form the endpoint.
    pub socket_path: String,

    /// Reconnect delay after a successful open.
    pub backoff_base: Duration,

    /// Upper bound on the reconnect delay.
    pub backoff_max: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the endpoint scheme, e.g. `wss`.
    #[inline]
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the endpoint path.
    #[inline]
    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Sets the reconnect delay after a successful open.
    #[inline]
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the reconnect delay cap.
    #[inline]
    #[must_use]
    pub fn with_backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = max;
        self
    }

    /// Sets both reconnect delays.
    #[inline]
    #[must_use]
    pub fn with_backoff(self, base: Duration, max: Duration) -> Self {
        self.with_backoff_base(base).with_backoff_max(max)
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ClientOptions {
    /// Returns a fresh backoff state for a new transport.
    #[inline]
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_base, self.backoff_max)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.scheme.chars();
        let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(Error::config(format!(
                "Invalid scheme {:?}. Use \"ws\" or \"wss\".",
                self.scheme
            )));
        }

        if !self.socket_path.starts_with('/') {
            return Err(Error::config(format!(
                "Socket path must start with '/', got {:?}",
                self.socket_path
            )));
        }

        if self.backoff_base.is_zero() {
            return Err(Error::config("Backoff base must be greater than zero"));
        }

        if self.backoff_max < self.backoff_base {
            return Err(Error::config(format!(
                "Backoff cap ({:?}) must not be below the base ({:?})",
                self.backoff_max, self.backoff_base
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
