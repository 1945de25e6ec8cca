//! Wall-clock sliding-window rate limiter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Dispatch timestamps within a trailing window.
///
/// Pruning happens only when the owner asks for it, so the window decays
/// correctly across any gap between dispatch passes.
#[derive(Debug, Clone)]
pub struct RateWindow {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RateWindow {
    /// Create an empty window of the given width.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: VecDeque::new(),
        }
    }

    /// Drop timestamps older than the window relative to `now`.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a dispatch at `now`.
    pub fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
    }

    /// Timestamps currently inside the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// True if no timestamp is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// True while fewer than `limit` timestamps are recorded.
    #[must_use]
    pub fn has_capacity(&self, limit: u32) -> bool {
        u32::try_from(self.stamps.len()).map_or(false, |n| n < limit)
    }
}
