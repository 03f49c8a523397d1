// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trailing-edge coalescing for noisy subscribers.
//!
//! A [`Debouncer`] does not own a timer. The host records activity with
//! [`Debouncer::notify`] and polls it from its own loop with [`Debouncer::poll`]; the
//! debouncer fires once after `delay` milliseconds without further activity.
//!
//! ```
//! use formwire_bus::Debouncer;
//!
//! let mut d = Debouncer::new(100);
//! d.notify(1_000);
//! d.notify(1_050); // restarts the quiet period
//! assert!(!d.poll(1_120));
//! assert!(d.poll(1_150));
//! assert!(!d.poll(2_000)); // fired already; nothing pending
//! ```

/// Trailing-edge debouncer driven by caller-supplied millisecond timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debouncer {
    delay: u64,
    last_activity: Option<u64>,
}

impl Debouncer {
    /// A debouncer with a quiet period of `delay` milliseconds.
    pub const fn new(delay: u64) -> Self {
        Self {
            delay,
            last_activity: None,
        }
    }

    /// The configured quiet period in milliseconds.
    pub const fn delay(&self) -> u64 {
        self.delay
    }

    /// Record activity at `now`, restarting the quiet period.
    pub fn notify(&mut self, now: u64) {
        self.last_activity = Some(now);
    }

    /// Whether activity is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.last_activity.is_some()
    }

    /// When the pending activity will fire, if any.
    pub fn deadline(&self) -> Option<u64> {
        self.last_activity.map(|t| t.saturating_add(self.delay))
    }

    /// Fire if the quiet period has elapsed at `now`. Fires at most once per burst.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_activity = None;
                true
            }
            _ => false,
        }
    }

    /// Fire immediately if anything is pending.
    pub fn flush(&mut self) -> bool {
        self.last_activity.take().is_some()
    }

    /// Drop pending activity without firing.
    pub fn cancel(&mut self) {
        self.last_activity = None;
    }
}
