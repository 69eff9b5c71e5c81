//! Exponential reconnect backoff.
//!
//! The delay starts at a base value, doubles after every failed attempt or
//! closed connection, is capped, and snaps back to the base as soon as a
//! connection opens. After `n` consecutive failures the delay is
//! `min(base * 2^n, max)`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default starting delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Default delay cap.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(32_000);

// ============================================================================
// Backoff
// ============================================================================

/// Reconnect delay state for one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after a successful open.
    base: Duration,
    /// Upper bound on the delay.
    max: Duration,
    /// Current delay.
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `base` and capped at `max`.
    ///
    /// A `max` below `base` is raised to `base`.
    #[inline]
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            current: base,
        }
    }

    /// Returns the current delay.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay cap.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Records a failed or closed cycle and returns the delay to wait
    /// before the next attempt.
    pub fn advance(&mut self) -> Duration {
        self.current = self.current.saturating_mul(2).min(self.max);
        self.current
    }

    /// Records a successful open.
    #[inline]
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX)
    }
}

// ============================================================================
// Tests
// ============================================================================
