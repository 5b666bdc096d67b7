//! # Liveness Calculator
//!
//! Tracks when a subscriber last made progress and reports whether a
//! threshold has elapsed since. Eviction is cooperative: the channel's
//! expiry sweep and the handlers themselves consult it, nothing interrupts a
//! running handler.

use shared_types::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct LivenessCalculator {
    clock: Arc<dyn Clock>,
    last_millis: AtomicU64,
    threshold_millis: u64,
}

impl LivenessCalculator {
    /// Samples the clock once as the initial liveness point.
    pub fn new(clock: Arc<dyn Clock>, threshold_millis: u64) -> Self {
        let now = clock.millis();
        Self {
            clock,
            last_millis: AtomicU64::new(now),
            threshold_millis,
        }
    }

    /// Record progress now.
    pub fn refresh(&self) {
        self.last_millis.store(self.clock.millis(), Ordering::Release);
    }

    /// True once strictly more than the threshold has elapsed since the last
    /// refresh.
    pub fn is_timeout_expired(&self) -> bool {
        let last = self.last_millis.load(Ordering::Acquire);
        self.clock.millis().saturating_sub(last) > self.threshold_millis
    }

    #[must_use]
    pub fn threshold_millis(&self) -> u64 {
        self.threshold_millis
    }
}

impl std::fmt::Debug for LivenessCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessCalculator")
            .field("last_millis", &self.last_millis.load(Ordering::Relaxed))
            .field("threshold_millis", &self.threshold_millis)
            .finish()
    }
}
