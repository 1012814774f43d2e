use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project::pin_project;
use tokio::time::{Instant, Sleep, sleep_until};

use crate::{Condition, Operation};

/// An attempt is either in flight or we are waiting out the backoff before the next one.
///
/// ```no_rust
/// Attempting --Ok--------------------------------------> Ready(Ok)
///     |------Err, condition says no------------------> Ready(Err)
///     |------Err, retryable, strategy exhausted------> Ready(Err)
///     '------Err, retryable, wait = next()--> Waiting --elapsed--> Attempting
/// ```
#[pin_project(project = PhaseProj)]
enum Phase<O>
where
    O: Operation,
{
    Attempting(#[pin] O::Future),
    Waiting(#[pin] Sleep),
}

/// Future that drives an [`Operation`] until it succeeds, hits a non-retryable error, or the
/// backoff strategy runs out of waits. The last error is returned in the latter two cases.
#[pin_project]
pub struct Retry<I, O, C>
where
    O: Operation,
{
    #[pin]
    phase: Phase<O>,
    waits: I,
    operation: O,
    condition: C,
}

impl<I, O, C> Retry<I, O, C>
where
    I: Iterator<Item = Duration>,
    O: Operation,
    C: Condition<O::Error>,
{
    pub fn new<S>(strategy: S, mut operation: O, condition: C) -> Self
    where
        S: IntoIterator<IntoIter = I, Item = Duration>,
    {
        Self {
            phase: Phase::Attempting(operation.run()),
            waits: strategy.into_iter(),
            operation,
            condition,
        }
    }
}

impl<I, O, C> Future for Retry<I, O, C>
where
    I: Iterator<Item = Duration>,
    O: Operation,
    C: Condition<O::Error>,
{
    type Output = Result<O::Item, O::Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let mut this = self.as_mut().project();
            let next_phase = match this.phase.as_mut().project() {
                PhaseProj::Attempting(attempt) => match attempt.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(item)) => return Poll::Ready(Ok(item)),
                    Poll::Ready(Err(err)) => {
                        if !this.condition.can_retry(&err) {
                            return Poll::Ready(Err(err));
                        }
                        match this.waits.next() {
                            None => return Poll::Ready(Err(err)),
                            Some(wait) => Phase::Waiting(sleep_until(Instant::now() + wait)),
                        }
                    }
                },
                PhaseProj::Waiting(sleep) => match sleep.poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(()) => Phase::Attempting(this.operation.run()),
                },
            };
            this.phase.set(next_phase);
        }
    }
}
