//! Exponential backoff with jitter for the transport decoder's reconnect
//! loop: initial delay, doubling factor, a cap, and +/-20% jitter.
//!
//! Generalized from the teacher's fixed-period `SpinSleeper` retry timing in
//! `component_a/sensor.rs` to a growing period.

use std::time::Duration;

use rand::random_range;

pub struct Backoff {
    initial: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial_ms: u64, cap_ms: u64) -> Self {
        let initial = Duration::from_millis(initial_ms);
        Self {
            initial,
            cap: Duration::from_millis(cap_ms),
            current: initial,
        }
    }

    /// Returns the delay to sleep before the next retry, applying +/-20%
    /// jitter, then doubles the underlying delay (capped) for next time.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        let jitter_frac = random_range(-0.2..=0.2);
        let jittered_secs = base.as_secs_f64() * (1.0 + jitter_frac);
        let delay = Duration::from_secs_f64(jittered_secs.max(0.0));

        let doubled = self.current.saturating_mul(2);
        self.current = doubled.min(self.cap);

        delay
    }

    /// Resets the backoff state after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_respect_cap() {
        let mut backoff = Backoff::new(500, 2000);
        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        let d3 = backoff.next_delay();
        let d4 = backoff.next_delay();

        // jitter is +/-20%, so compare against the unjittered envelope
        assert!(d1.as_millis() <= 600);
        assert!(d2.as_millis() <= 1200);
        assert!(d3.as_millis() <= 2400);
        assert!(d4.as_millis() <= 2400); // capped at 2000 +/- 20%
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut backoff = Backoff::new(500, 2000);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        let d = backoff.next_delay();
        assert!(d.as_millis() <= 600);
    }
}
