use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::{CoordinatorError, CoordinatorResult};

/// A countdown that releases once every registered producer has reported completion.
///
/// The barrier is armed for a fixed number of producers at construction. Each call to
/// [`done`](Self::done) consumes one registration; [`wait`](Self::wait) suspends until none
/// remain. Reporting more completions than were registered is rejected and leaves the
/// barrier untouched.
///
/// # Examples
///
/// ```rust
/// use tokio_mpsc_coordinator::ProducerBarrier;
///
/// #[tokio::main]
/// async fn main() {
///     let barrier = ProducerBarrier::new(1);
///     assert!(!barrier.is_released());
///
///     barrier.done().unwrap();
///     barrier.wait().await;
///
///     assert!(barrier.done().is_err());
/// }
/// ```
#[derive(Debug)]
pub struct ProducerBarrier {
    /// Number of producers registered at construction.
    expected: usize,
    /// Producers that have not reported completion yet.
    remaining: AtomicUsize,
    /// Woken when `remaining` reaches zero.
    released: Notify,
}

impl ProducerBarrier {
    /// Creates a barrier armed for `expected` completions.
    ///
    /// A barrier armed for zero producers is released from the start.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            remaining: AtomicUsize::new(expected),
            released: Notify::new(),
        }
    }

    /// Records the completion of one producer.
    ///
    /// # Returns
    ///
    /// `Ok(remaining)` with the number of producers still outstanding.
    /// `Err(CoordinatorError::ProducerOverflow)` if every registered producer already completed.
    pub fn done(&self) -> CoordinatorResult<usize> {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| CoordinatorError::ProducerOverflow {
                expected: self.expected,
            })?;

        let remaining = previous - 1;
        if remaining == 0 {
            self.released.notify_waiters();
        }
        Ok(remaining)
    }

    /// Suspends until every registered producer has reported completion.
    pub async fn wait(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_released() {
                return;
            }
            notified.await;
        }
    }

    /// Gets the number of producers the barrier was armed for.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Gets the number of producers that have not reported completion yet.
    ///
    /// # Returns
    ///
    /// `0` once the barrier is released.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Checks if every registered producer has reported completion.
    ///
    /// # Returns
    ///
    /// `true` if [`wait`](Self::wait) would return immediately, `false` otherwise.
    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }
}
