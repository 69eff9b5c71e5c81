//! Destination parsing.
//!
//! A destination names a host and a namespace in one string:
//! `"<host>[/<segment>...]"`. The first segment is the host (with optional
//! port); the rest, joined by `/` and prefixed with `/`, is the namespace.
//!
//! | Destination | Endpoint | Namespace |
//! |-------------|----------|-----------|
//! | `example.com` | `ws://example.com/socket` | `/` |
//! | `example.com:8080/chat` | `ws://example.com:8080/socket` | `/chat` |
//! | `example.com/chat/room1` | `ws://example.com/socket` | `/chat/room1` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::Namespace;

use super::options::ClientOptions;

// ============================================================================
// Constants
// ============================================================================

/// Characters that would end the authority early or add userinfo.
const HOST_DELIMITERS: &[char] = &['?', '#', '@', '\\'];

// ============================================================================
// Destination
// ============================================================================

/// A parsed destination string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Host with optional port.
    host: String,
    /// Namespace path.
    namespace: Namespace,
}

impl Destination {
    /// Splits a destination into host and namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDestination`] if the host segment is empty.
    pub fn parse(destination: &str) -> Result<Self> {
        let mut segments = destination.split('/');
        let host = segments.next().unwrap_or_default().trim();

        if host.is_empty() {
            return Err(Error::invalid_destination(destination, "missing host"));
        }

        Ok(Self {
            host: host.to_owned(),
            namespace: Namespace::from_segments(segments),
        })
    }

    /// Returns the host with optional port.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Consumes the destination and returns its namespace.
    #[inline]
    #[must_use]
    pub fn into_namespace(self) -> Namespace {
        self.namespace
    }

    /// Builds the transport endpoint: `{scheme}://{host}{socket_path}`.
    ///
    /// The URL is normalised, and its string form keys the registry. Hosts
    /// differing only in case, or a port equal to the scheme default, share
    /// one transport: `example.com:80/a` and `EXAMPLE.com/b` both connect to
    /// `ws://example.com/socket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDestination`] if the host does not form a
    /// valid URL or carries URL syntax beyond host and port (userinfo, a
    /// query, a fragment).
    pub fn endpoint(&self, options: &ClientOptions) -> Result<Url> {
        if let Some(c) = self.host.chars().find(|c| HOST_DELIMITERS.contains(c)) {
            return Err(Error::invalid_destination(
                self.to_string(),
                format!("unexpected {c:?} in host"),
            ));
        }

        let raw = format!("{}://{}{}", options.scheme, self.host, options.socket_path);
        let url = Url::parse(&raw)
            .map_err(|e| Error::invalid_destination(self.to_string(), e.to_string()))?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_destination(self.to_string(), "missing host"));
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(Error::invalid_destination(self.to_string(), "userinfo in host"));
        }

        Ok(url)
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_root() {
            f.write_str(&self.host)
        } else {
            write!(f, "{}{}", self.host, self.namespace)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
