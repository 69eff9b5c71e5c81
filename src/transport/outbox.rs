//! Outbound frame queue of one transport.
//!
//! Each physical connection gets a fresh unbounded channel. Sockets push
//! encoded envelopes into whichever channel is current; the transport task
//! drains it into the connection sink. Closing the outbox drops the sender,
//! so frames queued for a dead connection are discarded with it instead of
//! leaking into the next one.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::protocol::Envelope;

// ============================================================================
// Outbox
// ============================================================================

/// Write side shared between a transport task and its sockets.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    /// Sender for the current connection, `None` while disconnected.
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Outbox {
    /// Starts a new connection generation and returns its receiving end.
    pub(crate) fn open(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.lock() = Some(tx);
        rx
    }

    /// Ends the current connection generation.
    pub(crate) fn close(&self) {
        self.tx.lock().take();
    }

    /// Returns `true` while a connection is accepting frames.
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Encodes and queues an envelope on the current connection.
    ///
    /// Returns `false` if the envelope was dropped because it could not be
    /// encoded or no connection is open.
    pub(crate) fn send(&self, envelope: &Envelope) -> bool {
        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = %envelope.event, error = %e, "Failed to encode envelope");
                return false;
            }
        };

        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => {
                trace!(event = %envelope.event, "No open connection, frame dropped");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::{Namespace, SocketId};

    fn envelope(event: &str) -> Envelope {
        Envelope::outbound(Namespace::root(), SocketId::new("id"), event, vec![])
    }

    #[test]
    fn test_send_without_connection_drops() {
        let outbox = Outbox::default();
        assert!(!outbox.is_open());
        assert!(!outbox.send(&envelope("x")));
    }

    #[test]
    fn test_send_reaches_current_generation() {
        let outbox = Outbox::default();
        let mut rx = outbox.open();

        assert!(outbox.send(&envelope("a")));
        assert!(outbox.send(&envelope("b")));

        let first = Envelope::decode(&rx.try_recv().expect("frame")).expect("decode");
        let second = Envelope::decode(&rx.try_recv().expect("frame")).expect("decode");
        assert_eq!(first.event, "a");
        assert_eq!(second.event, "b");
    }

    #[test]
    fn test_old_generation_does_not_leak() {
        let outbox = Outbox::default();
        let mut old = outbox.open();
        outbox.send(&envelope("stale"));
        outbox.close();

        let mut new = outbox.open();
        outbox.send(&envelope("fresh"));

        assert_eq!(
            Envelope::decode(&new.try_recv().expect("frame")).expect("decode").event,
            "fresh"
        );
        assert!(new.try_recv().is_err());

        // The stale frame stays with the closed generation.
        assert_eq!(
            Envelope::decode(&old.try_recv().expect("frame")).expect("decode").event,
            "stale"
        );
    }
}
