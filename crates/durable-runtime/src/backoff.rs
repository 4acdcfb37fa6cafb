use std::time::Duration;

/// In-process retry policy for `SideEffect` (SPEC_FULL.md §4.6).
///
/// Grounded on `invariant-types::event::RetryPolicy`, the teacher's
/// placeholder (empty, TODO-marked) struct for the same concept — this is
/// the first implementation to give it real fields and behavior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    initial: Duration,
    multiplier: f64,
    max_delay: Duration,
    max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, multiplier: f64, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            multiplier,
            max_delay,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given attempt (1-indexed: attempt 1 is the first
    /// retry, following an initial failed try).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(30),
            10,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_then_caps() {
        let policy = BackoffPolicy::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(500),
            10,
        );
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    }

    #[test]
    fn default_allows_ten_attempts() {
        assert_eq!(BackoffPolicy::default().max_attempts(), 10);
    }
}
