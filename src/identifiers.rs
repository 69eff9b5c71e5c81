//! Type-safe identifiers for channels and namespaces.
//!
//! Newtype wrappers keep channel ids and namespace paths from being mixed
//! with arbitrary strings (event names, hosts) at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE as Base64UrlSafe;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Number of random bytes behind a [`SocketId`].
const SOCKET_ID_BYTES: usize = 32;

/// Path of the root namespace.
const ROOT_NAMESPACE: &str = "/";

// ============================================================================
// SocketId
// ============================================================================

/// Opaque channel identifier sent with every outbound envelope.
///
/// The remote end uses it to tell apart sockets that share a namespace on
/// one connection. Ids are 32 bytes from the OS random source, URL-safe
/// base64 encoded. Uniqueness is not checked locally: collisions are left
/// to the remote end, and local code never compares sockets by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    /// Mints a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        let mut buf = [0u8; SOCKET_ID_BYTES];
        OsRng.fill_bytes(&mut buf);
        Self(Base64UrlSafe.encode(buf))
    }

    /// Wraps an existing id, e.g. one received from the remote end.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// Namespace path of a logical socket, e.g. `/` or `/chat/room1`.
///
/// An empty path is the root namespace. Apart from that, namespaces match
/// by exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Creates a namespace, mapping the empty string to the root.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.is_empty() {
            Self::root()
        } else {
            Self(path)
        }
    }

    /// Returns the root namespace `/`.
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_NAMESPACE.to_string())
    }

    /// Builds a namespace from path segments: `["chat", "room1"]` gives
    /// `/chat/room1`, no segments give `/`.
    #[must_use]
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        let joined = segments.into_iter().collect::<Vec<_>>().join("/");
        Self(format!("/{joined}"))
    }

    /// Returns the path as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the root namespace.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NAMESPACE
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for Namespace {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = SocketId::generate();
        let b = SocketId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_id_encodes_32_bytes() {
        let id = SocketId::generate();
        let decoded = Base64UrlSafe.decode(id.as_str()).expect("valid base64");
        assert_eq!(decoded.len(), SOCKET_ID_BYTES);
        assert!(!id.as_str().contains('+'));
        assert!(!id.as_str().contains('/'));
    }

    #[test]
    fn test_empty_namespace_is_root() {
        assert_eq!(Namespace::new(""), Namespace::root());
        assert!(Namespace::new("").is_root());
    }

    #[test]
    fn test_namespace_kept_verbatim() {
        assert_eq!(Namespace::new("/chat").as_str(), "/chat");
        assert_eq!(Namespace::new("chat").as_str(), "chat");
    }

    #[test]
    fn test_namespace_from_segments() {
        assert_eq!(Namespace::from_segments(Vec::<&str>::new()).as_str(), "/");
        assert_eq!(
            Namespace::from_segments(["chat", "room1"]).as_str(),
            "/chat/room1"
        );
    }

    #[test]
    fn test_namespace_serde_transparent() {
        let json = serde_json::to_string(&Namespace::new("/a")).expect("serialize");
        assert_eq!(json, "\"/a\"");
    }
}
