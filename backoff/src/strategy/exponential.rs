use std::time::Duration;

use rand::Rng;

/// Exponential backoff: the n-th wait is `initial * factor^(n-1)`, capped at `max`.
///
/// With a non-zero `jitter` every wait is scaled by a random factor drawn from
/// `[1 - jitter, 1 + jitter]` and capped again. The iterator never ends on its own, use
/// [`Iterator::take`] to limit the number of retries.
///
/// ```
/// use std::time::Duration;
/// use backoff::strategy::exponential::Exponential;
///
/// let waits: Vec<_> = Exponential::from_millis(100, 1_000)
///     .factor(3.0)
///     .take(4)
///     .collect();
/// assert_eq!(
///     waits,
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(300),
///         Duration::from_millis(900),
///         Duration::from_millis(1_000),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Exponential {
    current: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
}

impl Exponential {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            max,
            factor: 2.0,
            jitter: 0.0,
        }
    }

    pub fn from_millis(initial_ms: u64, max_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
        )
    }

    /// Growth factor between consecutive waits. Values below 1.0 are treated as 1.0.
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor.max(1.0);
        self
    }

    /// Relative randomisation of each wait, clamped to `0.0..=1.0`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    fn jittered(&self, wait: Duration) -> Duration {
        if self.jitter == 0.0 {
            return wait;
        }
        let scale = rand::rng().random_range(1.0 - self.jitter..=1.0 + self.jitter);
        wait.mul_f64(scale).min(self.max)
    }
}

impl Iterator for Exponential {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let wait = self.current.min(self.max);
        self.current = self.current.mul_f64(self.factor).min(self.max);
        Some(self.jittered(wait))
    }
}
