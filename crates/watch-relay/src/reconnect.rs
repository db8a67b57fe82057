//! # Reconnect policies
//!
//! Decides how long the relay waits between a subscription closing and the
//! next open. The default, [`Immediate`], reopens with no delay: an endpoint
//! that closes instantly produces a tight reconnect loop.
//!
//! [`FibonacciBackoff`] grows the delay along the Fibonacci sequence up to a
//! cap, and resets once a subscription delivers events again.

use std::time::Duration;

/// Delay strategy applied after every subscription closure.
pub trait ReconnectPolicy: Send {
    /// Delay before reopening.
    ///
    /// `delivered` is true when the closed subscription produced at least one
    /// event.
    fn next_delay(&mut self, delivered: bool) -> Duration;
}

/// Reopen right away.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ReconnectPolicy for Immediate {
    fn next_delay(&mut self, _delivered: bool) -> Duration {
        Duration::ZERO
    }
}

/// Fibonacci backoff calculator
///
/// Generates delays following the Fibonacci sequence: min, min, 2·min,
/// 3·min, 5·min, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay (for reset)
    min: Duration,
    /// Previous delay
    prev: Duration,
    /// Current delay
    current: Duration,
    /// Maximum delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given minimum and maximum delays
    ///
    /// # Arguments
    ///
    /// * `min` - First delay, used for the first two values
    /// * `max` - Upper bound of the sequence
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

impl ReconnectPolicy for FibonacciBackoff {
    fn next_delay(&mut self, delivered: bool) -> Duration {
        if delivered {
            self.reset();
        }
        self.next_backoff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_immediate_never_waits() {
        let mut policy = Immediate;
        assert_eq!(policy.next_delay(false), Duration::ZERO);
        assert_eq!(policy.next_delay(true), Duration::ZERO);
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(SECOND, 10 * SECOND);

        assert_eq!(backoff.next_backoff(), SECOND);
        assert_eq!(backoff.next_backoff(), SECOND);
        assert_eq!(backoff.next_backoff(), 2 * SECOND);
        assert_eq!(backoff.next_backoff(), 3 * SECOND);
        assert_eq!(backoff.next_backoff(), 5 * SECOND);
        assert_eq!(backoff.next_backoff(), 8 * SECOND);
        // 13s capped
        assert_eq!(backoff.next_backoff(), 10 * SECOND);
        assert_eq!(backoff.next_backoff(), 10 * SECOND);
    }

    #[test]
    fn test_fibonacci_resets_after_delivery() {
        let mut backoff = FibonacciBackoff::new(SECOND, 10 * SECOND);

        assert_eq!(backoff.next_delay(false), SECOND);
        assert_eq!(backoff.next_delay(false), SECOND);
        assert_eq!(backoff.next_delay(false), 2 * SECOND);
        assert_eq!(backoff.next_delay(false), 3 * SECOND);

        // A productive subscription restarts the sequence
        assert_eq!(backoff.next_delay(true), SECOND);
        assert_eq!(backoff.next_delay(false), SECOND);
        assert_eq!(backoff.next_delay(false), 2 * SECOND);
    }
}
