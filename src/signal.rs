use std::sync::OnceLock;

use tokio::sync::Notify;

use crate::{CoordinatorError, CoordinatorResult};

/// How a consumption loop ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Both streams were observed closed and every item was handled.
    #[default]
    Drained,
    /// A handler panicked. The loop kept draining without calling handlers.
    HandlerPanicked(String),
    /// The consumption loop was dropped before both streams closed.
    Abandoned,
}

/// Totals gathered by a consumption loop, carried by the completion signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Message batches handed to the message handler.
    pub messages: usize,
    /// Error values handed to the error handler.
    pub errors: usize,
    /// Items received after a handler failure and dropped without a handler call.
    pub discarded: usize,
    /// How the consumption loop ended.
    pub outcome: ConsumeOutcome,
}

impl ConsumeReport {
    /// Checks if the consumer finished by draining both streams.
    ///
    /// # Returns
    ///
    /// `true` for [`ConsumeOutcome::Drained`], `false` otherwise.
    pub fn is_drained(&self) -> bool {
        self.outcome == ConsumeOutcome::Drained
    }

    /// Turns a failed outcome into the matching [`CoordinatorError`].
    pub fn into_result(self) -> CoordinatorResult<Self> {
        match self.outcome {
            ConsumeOutcome::Drained => Ok(self),
            ConsumeOutcome::HandlerPanicked(message) => {
                Err(CoordinatorError::HandlerPanicked { message })
            }
            ConsumeOutcome::Abandoned => Err(CoordinatorError::ConsumerAbandoned),
        }
    }
}

/// Single-use flag raised by the consumer when it stops, waited on by shutdown.
///
/// The signal carries the consumer's [`ConsumeReport`]. It can be raised once; any number
/// of tasks may wait on it.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    report: OnceLock<ConsumeReport>,
    raised: Notify,
}

impl CompletionSignal {
    /// Creates a signal that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal with the consumer's `report`, waking every waiter.
    ///
    /// # Returns
    ///
    /// `Err(CoordinatorError::SignalAlreadyRaised)` if the signal was raised before. The
    /// first report is kept.
    pub fn raise(&self, report: ConsumeReport) -> CoordinatorResult<()> {
        self.report
            .set(report)
            .map_err(|_| CoordinatorError::SignalAlreadyRaised)?;
        self.raised.notify_waiters();
        Ok(())
    }

    /// Suspends until the signal is raised and returns a copy of its report.
    pub async fn wait(&self) -> ConsumeReport {
        loop {
            let notified = self.raised.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(report) = self.report.get() {
                return report.clone();
            }
            notified.await;
        }
    }

    /// Checks if the signal has been raised.
    pub fn is_raised(&self) -> bool {
        self.report.get().is_some()
    }

    /// The raised report, if any.
    pub fn report(&self) -> Option<&ConsumeReport> {
        self.report.get()
    }
}
