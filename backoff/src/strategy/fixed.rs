use std::time::Duration;

/// Yields the same wait forever. Combine with [`Iterator::take`] to bound the retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    wait: Duration,
}

impl Interval {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

impl Iterator for Interval {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.wait)
    }
}
