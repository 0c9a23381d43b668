use rand::Rng;
use std::time::Duration;

/// Capped exponential backoff with optional additive jitter.
///
/// The n-th delay (0-indexed) is `min(max, initial * multiplier^n)` plus a
/// jitter drawn uniformly from `[0, jitter_ratio * that term]`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter_ratio: f64,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            jitter_ratio: 0.0,
            current_attempt: 0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Deterministic part of the delay for a 0-indexed attempt
    pub fn exponential_term(&self, attempt: u32) -> Duration {
        let multiplier = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_ms = self.initial.as_millis() as f64 * multiplier;
        let delay_ms = delay_ms.min(self.max.as_millis() as f64);
        Duration::from_millis(delay_ms as u64)
    }

    /// Largest jitter that can be added to the given attempt's delay
    pub fn jitter_cap(&self, attempt: u32) -> Duration {
        self.exponential_term(attempt).mul_f64(self.jitter_ratio)
    }

    pub fn next_delay(&mut self) -> Duration {
        let term = self.exponential_term(self.current_attempt);
        let cap_ms = term.as_millis() as f64 * self.jitter_ratio;
        let jitter_ms = if cap_ms > 0.0 {
            rand::thread_rng().gen_range(0.0..=cap_ms)
        } else {
            0.0
        };

        self.current_attempt += 1;
        term + Duration::from_millis(jitter_ms as u64)
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_initial() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10));

        let delay = backoff.next_delay();
        assert_eq!(delay, Duration::from_millis(100));
        assert_eq!(backoff.current_attempt(), 1);
    }

    #[test]
    fn test_exponential_backoff_progression() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10));

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_exponential_backoff_max_cap() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));

        for _ in 0..20 {
            assert!(backoff.next_delay() <= Duration::from_secs(1));
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff_reset() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10));

        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current_attempt(), 3);

        backoff.reset();
        assert_eq!(backoff.current_attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_custom_multiplier() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10))
                .with_multiplier(3.0);

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(300));
        assert_eq!(backoff.next_delay(), Duration::from_millis(900));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let mut backoff = ExponentialBackoff::new(Duration::from_millis(200), Duration::from_secs(5))
            .with_jitter(0.3);

        for attempt in 0..8 {
            let term = backoff.exponential_term(attempt);
            let cap = backoff.jitter_cap(attempt);
            let delay = backoff.next_delay();
            assert!(delay >= term, "attempt {attempt}: {delay:?} < {term:?}");
            assert!(delay <= term + cap, "attempt {attempt}: {delay:?} > {:?}", term + cap);
        }
    }

    #[test]
    fn test_jitter_ratio_is_clamped() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1))
            .with_jitter(4.0);
        assert_eq!(backoff.jitter_cap(0), Duration::from_millis(100));
    }
}
