//! Retry a fallible async operation, sleeping between attempts according to a backoff strategy.
//!
//! A strategy is any `Iterator<Item = Duration>`; every item is one permitted retry and the wait
//! before it. Bound the number of retries with [`Iterator::take`].
//!
//! ```no_run
//! # async fn fetch() -> Result<u32, std::io::Error> { Ok(1) }
//! # async fn demo() {
//! use backoff::retry::Retry;
//! use backoff::strategy::fixed;
//!
//! let page = Retry::new(
//!     fixed::Interval::from_millis(50).take(3),
//!     || fetch(),
//!     |e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut,
//! )
//! .await;
//! # }
//! ```

use std::future::Future;

pub mod retry;
pub mod strategy;

/// Something that can be attempted more than once. Every call to [`Operation::run`] must start a
/// fresh attempt.
pub trait Operation {
    type Item;
    type Error;
    type Future: Future<Output = Result<Self::Item, Self::Error>>;

    fn run(&mut self) -> Self::Future;
}

impl<I, E, T, F> Operation for F
where
    F: FnMut() -> T,
    T: Future<Output = Result<I, E>>,
{
    type Item = I;
    type Error = E;
    type Future = T;

    fn run(&mut self) -> Self::Future {
        self()
    }
}

/// Decides whether a failed attempt is worth repeating.
pub trait Condition<E> {
    fn can_retry(&mut self, error: &E) -> bool;
}

impl<E, F> Condition<E> for F
where
    F: FnMut(&E) -> bool,
{
    fn can_retry(&mut self, error: &E) -> bool {
        self(error)
    }
}
