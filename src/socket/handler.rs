//! Event handler table.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::{Value, from_value};
use tracing::warn;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called with the event's positional arguments. Handlers run on the
/// transport's event loop and must not block it.
pub type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

// ============================================================================
// HandlerTable
// ============================================================================

/// One handler per event name; registering again replaces the old one.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: FxHashMap<String, Handler>,
}

impl HandlerTable {
    /// Registers `handler` for `event`. Returns `true` if it replaced one.
    pub(crate) fn insert(&mut self, event: String, handler: Handler) -> bool {
        self.handlers.insert(event, handler).is_some()
    }

    /// Removes the handler for `event`. Returns `true` if one existed.
    pub(crate) fn remove(&mut self, event: &str) -> bool {
        self.handlers.remove(event).is_some()
    }

    /// Returns the handler for `event`, if any.
    #[inline]
    pub(crate) fn get(&self, event: &str) -> Option<Handler> {
        self.handlers.get(event).cloned()
    }

    /// Returns the number of registered events.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

/// Wraps a typed callback into a [`Handler`].
///
/// The argument list is decoded as one JSON array into `T`, so tuples map
/// arguments by position: `(String, u32)` takes `["a", 1]`. Calls whose
/// arguments do not decode are logged and skipped.
pub(crate) fn decoded<T, F>(event: String, callback: F) -> Handler
where
    T: DeserializeOwned + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |args: &[Value]| {
        match from_value::<T>(Value::Array(args.to_vec())) {
            Ok(value) => callback(value),
            Err(e) => warn!(event = %event, error = %e, "Failed to decode event arguments"),
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_insert_reports_replacement() {
        let mut table = HandlerTable::default();
        assert!(!table.insert("x".into(), Arc::new(|_: &[Value]| {})));
        assert!(table.insert("x".into(), Arc::new(|_: &[Value]| {})));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_missing_is_none() {
        let table = HandlerTable::default();
        assert!(table.get("nothing").is_none());
    }

    #[test]
    fn test_remove() {
        let mut table = HandlerTable::default();
        table.insert("x".into(), Arc::new(|_: &[Value]| {}));
        assert!(table.remove("x"));
        assert!(!table.remove("x"));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_decoded_tuple_arguments() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let handler = decoded("pair".into(), move |(name, n): (String, u32)| {
            *sink.lock() = Some((name, n));
        });

        handler(&[json!("a"), json!(1)]);
        assert_eq!(*seen.lock(), Some(("a".to_string(), 1)));
    }

    #[test]
    fn test_decoded_mismatch_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = decoded("n".into(), move |_: (u32,)| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handler(&[json!("not a number")]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handler(&[json!(5)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
