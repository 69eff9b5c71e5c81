//! Reserved event names.
//!
//! Application events are free-form strings. A few names are produced by
//! the library itself around connection lifecycle changes.
//!
//! | Name | Direction | Meaning |
//! |------|-----------|---------|
//! | [`CONNECTION`] | Local → Remote | This logical socket is live on the connection |
//! | [`CONNECT`] | Local dispatch | The transport opened; the socket switched to direct mode |
//! | [`DISCONNECT`] | Local dispatch | The transport closed; the socket is buffering again |

/// Emitted to the remote end when a socket goes live.
pub const CONNECTION: &str = "connection";

/// Dispatched locally when a socket's transport opens.
pub const CONNECT: &str = "connect";

/// Dispatched locally when a socket's transport closes.
pub const DISCONNECT: &str = "disconnect";
