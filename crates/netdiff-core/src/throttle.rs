#![forbid(unsafe_code)]

//! Trailing-edge throttling for viewport-driven recomputation.
//!
//! Pan and zoom arrive in bursts. Label placement only needs to run once the
//! burst settles, so [`TrailingThrottle`] keeps the latest value and releases
//! it when the window elapses. Earlier values in the window are dropped.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use netdiff_core::throttle::TrailingThrottle;
//! use web_time::Instant;
//!
//! let mut throttle = TrailingThrottle::new(Duration::from_millis(150));
//! let t0 = Instant::now();
//! throttle.push(1, t0);
//! throttle.push(2, t0 + Duration::from_millis(50));
//!
//! assert_eq!(throttle.poll(t0 + Duration::from_millis(100)), None);
//! assert_eq!(throttle.poll(t0 + Duration::from_millis(150)), Some(2));
//! assert_eq!(throttle.poll(t0 + Duration::from_millis(400)), None);
//! ```

use std::time::Duration;

use web_time::Instant;

/// Default window used for label recomputation.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(150);

/// Collapses a burst of values into the last one.
///
/// The window opens at the first push after an idle period and closes
/// `window` later; pushes inside the window only replace the pending value.
/// Not thread-safe; drive it from the event loop.
#[derive(Debug, Clone)]
pub struct TrailingThrottle<T> {
    window: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
    /// Number of values collapsed into the pending one.
    coalesced: u32,
}

impl<T> TrailingThrottle<T> {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
            coalesced: 0,
        }
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a value. Latest wins.
    pub fn push(&mut self, value: T, now: Instant) {
        if self.pending.is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
        } else {
            self.deadline = Some(now + self.window);
            self.coalesced = 0;
        }
        self.pending = Some(value);
    }

    /// Release the pending value if the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// When the pending value becomes due.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Values dropped in favor of the pending one.
    #[inline]
    pub fn coalesced(&self) -> u32 {
        self.coalesced
    }
}

impl<T> Default for TrailingThrottle<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_poll_is_none() {
        let mut t: TrailingThrottle<u8> = TrailingThrottle::default();
        assert_eq!(t.poll(Instant::now()), None);
        assert!(t.deadline().is_none());
    }

    #[test]
    fn burst_collapses_to_last() {
        let mut t = TrailingThrottle::new(ms(150));
        let t0 = Instant::now();
        for i in 0..10 {
            t.push(i, t0 + ms(i * 10));
        }
        assert_eq!(t.coalesced(), 9);
        assert_eq!(t.poll(t0 + ms(149)), None);
        assert_eq!(t.poll(t0 + ms(150)), Some(9));
        assert!(!t.has_pending());
    }

    #[test]
    fn deadline_does_not_slide() {
        let mut t = TrailingThrottle::new(ms(100));
        let t0 = Instant::now();
        t.push('a', t0);
        t.push('b', t0 + ms(90));
        assert_eq!(t.deadline(), Some(t0 + ms(100)));
    }

    #[test]
    fn new_window_after_release() {
        let mut t = TrailingThrottle::new(ms(100));
        let t0 = Instant::now();
        t.push(1, t0);
        assert_eq!(t.poll(t0 + ms(100)), Some(1));
        t.push(2, t0 + ms(500));
        assert_eq!(t.deadline(), Some(t0 + ms(600)));
        assert_eq!(t.coalesced(), 0);
    }

    #[test]
    fn flush_ignores_deadline() {
        let mut t = TrailingThrottle::new(ms(1000));
        let t0 = Instant::now();
        t.push("x", t0);
        assert_eq!(t.flush(), Some("x"));
        assert_eq!(t.poll(t0 + ms(2000)), None);
    }
}
