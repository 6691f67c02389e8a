use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::channel::{Receiver, Sender, channel};
use crate::{
    CompletionSignal, ConsumeOutcome, ConsumeReport, CoordinatorConfig, CoordinatorError,
    CoordinatorResult, ProducerBarrier,
};

/// Boxed error type used when the error stream carries arbitrary errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Multi-producer, single-consumer coordinator.
///
/// A fixed number of producers send message batches and errors; a single consumer drains
/// both streams through [`consume`](Self::consume); the orchestrating task joins everything
/// with [`wait_and_close`](Self::wait_and_close), which returns once every producer has
/// completed and the consumer has handled every item.
///
/// The coordinator is single-shot: one consumption cycle per instance. Cloning returns
/// another handle to the same instance.
///
/// # Examples
///
/// ```rust
/// use tokio_mpsc_coordinator::Coordinator;
///
/// #[tokio::main]
/// async fn main() {
///     let coordinator: Coordinator<String> = Coordinator::new(2);
///
///     for i in 0..2 {
///         let producer = coordinator.clone();
///         tokio::spawn(async move {
///             let guard = producer.producer_guard();
///             if let Err(e) = producer.send_message([format!("hello-{i}")]).await {
///                 eprintln!("Send failed: {}", e);
///             }
///             drop(guard);
///         });
///     }
///
///     let consumer = coordinator.clone();
///     tokio::spawn(async move {
///         consumer
///             .consume(
///                 |batch| println!("new message: {:?}", batch),
///                 |err| eprintln!("error: {}", err),
///             )
///             .await
///     });
///
///     let report = coordinator.wait_and_close().await.unwrap();
///     assert_eq!(report.messages, 2);
/// }
/// ```
pub struct Coordinator<M, E = BoxError> {
    inner: Arc<Inner<M, E>>,
}

/// The state shared by every handle of one coordinator.
struct Inner<M, E> {
    config: CoordinatorConfig,
    /// Released once every registered producer has completed.
    producers: ProducerBarrier,
    messages_tx: Sender<Vec<M>>,
    messages_rx: Receiver<Vec<M>>,
    errors_tx: Sender<E>,
    errors_rx: Receiver<E>,
    /// Raised by the consumer when its loop ends.
    completion: CompletionSignal,
    consumer_started: AtomicBool,
    /// Set by the shutdown call that closes the channels.
    is_closed: AtomicBool,
}

/// Open/closed state of the two streams seen by the consumption loop.
///
/// Transitions happen when a receive reports a closed stream, in either order.
/// `BothClosed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    BothOpen,
    MessagesOnly,
    ErrorsOnly,
    BothClosed,
}

impl StreamState {
    /// Checks if the message stream is still polled.
    pub fn messages_open(self) -> bool {
        matches!(self, Self::BothOpen | Self::MessagesOnly)
    }

    /// Checks if the error stream is still polled.
    pub fn errors_open(self) -> bool {
        matches!(self, Self::BothOpen | Self::ErrorsOnly)
    }

    /// Checks if both streams have closed.
    pub fn is_terminal(self) -> bool {
        self == Self::BothClosed
    }

    /// State after the message stream reported closed.
    pub fn close_messages(self) -> Self {
        if self.errors_open() {
            Self::ErrorsOnly
        } else {
            Self::BothClosed
        }
    }

    /// State after the error stream reported closed.
    pub fn close_errors(self) -> Self {
        if self.messages_open() {
            Self::MessagesOnly
        } else {
            Self::BothClosed
        }
    }
}

impl<M, E> Coordinator<M, E> {
    /// Creates a coordinator expecting `expected_producers` completion signals.
    ///
    /// With zero producers, [`wait_and_close`](Self::wait_and_close) closes the streams as
    /// soon as it is called.
    pub fn new(expected_producers: usize) -> Self {
        Self::with_config(CoordinatorConfig::new(expected_producers))
    }

    /// Creates a coordinator from a full [`CoordinatorConfig`].
    ///
    /// # Arguments
    ///
    /// * `config` - Producer count, log name and optional shutdown timeout.
    pub fn with_config(config: CoordinatorConfig) -> Self {
        let (messages_tx, messages_rx) = channel();
        let (errors_tx, errors_rx) = channel();

        debug!(
            coordinator = %config.name,
            expected_producers = config.expected_producers,
            "coordinator created"
        );

        Self {
            inner: Arc::new(Inner {
                producers: ProducerBarrier::new(config.expected_producers),
                messages_tx,
                messages_rx,
                errors_tx,
                errors_rx,
                completion: CompletionSignal::new(),
                consumer_started: AtomicBool::new(false),
                is_closed: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Sends one batch of messages and waits until the consumer has taken it.
    ///
    /// Must happen before this producer signals completion.
    ///
    /// # Returns
    ///
    /// `Err(CoordinatorError::Channel(ChannelClosed))` if shutdown already closed the
    /// message stream.
    pub async fn send_message<I>(&self, batch: I) -> CoordinatorResult<()>
    where
        I: IntoIterator<Item = M>,
    {
        let batch: Vec<M> = batch.into_iter().collect();
        self.inner.messages_tx.send(batch).await.map_err(|e| {
            warn!(coordinator = %self.name(), "message sent after shutdown closed the stream");
            e.into()
        })
    }

    /// Sends one batch of messages, then signals this producer's completion.
    ///
    /// Completion is signaled on every exit path, including a failed send and the returned
    /// future being dropped before it finishes.
    pub async fn send_message_and_complete<I>(&self, batch: I) -> CoordinatorResult<()>
    where
        I: IntoIterator<Item = M>,
    {
        let guard = self.producer_guard();
        self.send_message(batch).await?;
        guard.complete()
    }

    /// Sends an error value and waits until the consumer has taken it.
    pub async fn send_error(&self, err: E) -> CoordinatorResult<()> {
        self.inner.errors_tx.send(err).await.map_err(|e| {
            warn!(coordinator = %self.name(), "error sent after shutdown closed the stream");
            e.into()
        })
    }

    /// Signals that one producer has finished sending.
    ///
    /// Must be called exactly once per registered producer.
    ///
    /// # Returns
    ///
    /// `Err(CoordinatorError::ProducerOverflow)` if every registered producer already
    /// completed. The barrier is not affected.
    pub fn sig_producer_completion(&self) -> CoordinatorResult<()> {
        match self.inner.producers.done() {
            Ok(0) => {
                debug!(coordinator = %self.name(), "all producers completed");
                Ok(())
            }
            Ok(remaining) => {
                debug!(coordinator = %self.name(), remaining, "producer completed");
                Ok(())
            }
            Err(e) => {
                warn!(coordinator = %self.name(), error = %e, "producer completion rejected");
                Err(e)
            }
        }
    }

    /// Returns a guard that signals this producer's completion when dropped.
    pub fn producer_guard(&self) -> ProducerGuard<M, E> {
        ProducerGuard {
            coordinator: self.clone(),
            fired: false,
        }
    }

    /// Drains the message and error streams until both are closed, calling `on_message` for
    /// each batch and `on_error` for each error.
    ///
    /// Handlers run one at a time on the calling task. When both streams have closed the
    /// completion signal is raised and the report returned. A panicking handler does not
    /// stop the loop: the remaining items are received and discarded so producers are not
    /// left blocked, and the failure is reported through the completion signal. Panics are
    /// only caught when the crate is built with unwinding panics.
    ///
    /// If the returned future is dropped before the streams close, the completion signal is
    /// raised with [`ConsumeOutcome::Abandoned`].
    ///
    /// # Returns
    ///
    /// `Err(CoordinatorError::ConsumerAlreadyRunning)` if `consume` was already called on
    /// this coordinator. Otherwise the consumer's report, or the error matching its outcome.
    pub async fn consume<F, G>(
        &self,
        mut on_message: F,
        mut on_error: G,
    ) -> CoordinatorResult<ConsumeReport>
    where
        F: FnMut(Vec<M>),
        G: FnMut(E),
    {
        if self.inner.consumer_started.swap(true, Ordering::AcqRel) {
            warn!(coordinator = %self.name(), "second consumer rejected");
            return Err(CoordinatorError::ConsumerAlreadyRunning);
        }

        let mut guard = ConsumerGuard {
            inner: &self.inner,
            report: ConsumeReport::default(),
            armed: true,
        };
        let mut failure: Option<String> = None;
        let mut state = StreamState::BothOpen;
        debug!(coordinator = %self.name(), "consumer started");

        while !state.is_terminal() {
            tokio::select! {
                batch = self.inner.messages_rx.recv(), if state.messages_open() => match batch {
                    Some(batch) => {
                        trace!(coordinator = %self.name(), len = batch.len(), "message batch received");
                        if dispatch(self.name(), &mut on_message, batch, &mut failure) {
                            guard.report.messages += 1;
                        } else {
                            guard.report.discarded += 1;
                        }
                    }
                    None => {
                        state = state.close_messages();
                        debug!(coordinator = %self.name(), ?state, "message stream closed");
                    }
                },
                err = self.inner.errors_rx.recv(), if state.errors_open() => match err {
                    Some(err) => {
                        trace!(coordinator = %self.name(), "error received");
                        if dispatch(self.name(), &mut on_error, err, &mut failure) {
                            guard.report.errors += 1;
                        } else {
                            guard.report.discarded += 1;
                        }
                    }
                    None => {
                        state = state.close_errors();
                        debug!(coordinator = %self.name(), ?state, "error stream closed");
                    }
                },
            }
        }

        let outcome = match failure {
            Some(message) => ConsumeOutcome::HandlerPanicked(message),
            None => ConsumeOutcome::Drained,
        };
        guard.finish(outcome)?.into_result()
    }

    /// Waits for every producer, closes both streams, then waits for the consumer to finish.
    ///
    /// This is the join point for the orchestrating task. If the configuration carries a
    /// shutdown timeout it applies as in [`wait_and_close_timeout`](Self::wait_and_close_timeout).
    ///
    /// # Returns
    ///
    /// The consumer's report once it has drained both streams.
    /// `Err(CoordinatorError::AlreadyClosed)` if the streams were already closed by a
    /// previous call.
    /// `Err(CoordinatorError::HandlerPanicked)` or `Err(CoordinatorError::ConsumerAbandoned)`
    /// if the consumer did not finish cleanly.
    pub async fn wait_and_close(&self) -> CoordinatorResult<ConsumeReport> {
        match self.inner.config.shutdown_timeout {
            Some(timeout) => self.wait_and_close_timeout(timeout).await,
            None => self.shutdown().await,
        }
    }

    /// Like [`wait_and_close`](Self::wait_and_close), giving up after `timeout`.
    ///
    /// A timeout usually means a producer never signaled completion or the consumer never
    /// ran. If it expires while waiting on producers the streams stay open and the call can
    /// be retried; if it expires while waiting on the consumer they are already closed.
    pub async fn wait_and_close_timeout(
        &self,
        timeout: Duration,
    ) -> CoordinatorResult<ConsumeReport> {
        match tokio::time::timeout(timeout, self.shutdown()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    coordinator = %self.name(),
                    remaining_producers = self.inner.producers.remaining(),
                    consumer_done = self.inner.completion.is_raised(),
                    "shutdown timed out"
                );
                Err(CoordinatorError::ShutdownTimeout { elapsed: timeout })
            }
        }
    }

    async fn shutdown(&self) -> CoordinatorResult<ConsumeReport> {
        if self.is_closed() {
            return Err(CoordinatorError::AlreadyClosed);
        }

        self.inner.producers.wait().await;

        if self.inner.is_closed.swap(true, Ordering::AcqRel) {
            warn!(coordinator = %self.name(), "coordinator closed twice");
            return Err(CoordinatorError::AlreadyClosed);
        }
        self.inner.messages_tx.close();
        self.inner.errors_tx.close();
        debug!(coordinator = %self.name(), "producers done, streams closed");

        let report = self.inner.completion.wait().await;
        debug!(
            coordinator = %self.name(),
            messages = report.messages,
            errors = report.errors,
            "consumer done"
        );
        report.into_result()
    }

    /// Gets the number of producers registered at construction.
    pub fn expected_producers(&self) -> usize {
        self.inner.producers.expected()
    }

    /// Gets the name carried by this coordinator's log events.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Checks if a consumer has started draining this coordinator.
    ///
    /// # Returns
    ///
    /// `true` once [`consume`](Self::consume) has been entered, even after it returned.
    pub fn has_consumer(&self) -> bool {
        self.inner.consumer_started.load(Ordering::Acquire)
    }

    /// Checks if shutdown has closed the streams.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed.load(Ordering::Acquire)
    }

    /// The producer-completion barrier, for manual composition.
    pub fn producers(&self) -> &ProducerBarrier {
        &self.inner.producers
    }

    /// The sending half of the message stream, for manual composition.
    pub fn message_sender(&self) -> &Sender<Vec<M>> {
        &self.inner.messages_tx
    }

    /// The receiving half of the message stream, for manual composition.
    pub fn message_receiver(&self) -> &Receiver<Vec<M>> {
        &self.inner.messages_rx
    }

    /// The sending half of the error stream, for manual composition.
    pub fn error_sender(&self) -> &Sender<E> {
        &self.inner.errors_tx
    }

    /// The receiving half of the error stream, for manual composition.
    pub fn error_receiver(&self) -> &Receiver<E> {
        &self.inner.errors_rx
    }

    /// The consumer completion signal, for manual composition.
    pub fn completion(&self) -> &CompletionSignal {
        &self.inner.completion
    }
}

impl<M, E> Clone for Coordinator<M, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Signals one producer's completion when dropped.
///
/// Obtained from [`Coordinator::producer_guard`]. Holding one for the whole body of a
/// producer makes its completion fire on every exit path, early returns and cancellation
/// included.
pub struct ProducerGuard<M, E = BoxError> {
    coordinator: Coordinator<M, E>,
    fired: bool,
}

impl<M, E> ProducerGuard<M, E> {
    /// Signals completion now, surfacing a rejected signal to the caller.
    pub fn complete(mut self) -> CoordinatorResult<()> {
        self.fired = true;
        self.coordinator.sig_producer_completion()
    }
}

impl<M, E> Drop for ProducerGuard<M, E> {
    fn drop(&mut self) {
        if !self.fired {
            // Rejections are already logged by `sig_producer_completion`
            let _ = self.coordinator.sig_producer_completion();
        }
    }
}

/// Raises the completion signal exactly once, even if the consumption loop is dropped.
///
/// A loop dropped early also disconnects both streams, so producers blocked in a send, or
/// sending later, fail instead of waiting for a consumer that is gone.
struct ConsumerGuard<'a, M, E> {
    inner: &'a Inner<M, E>,
    report: ConsumeReport,
    armed: bool,
}

impl<M, E> ConsumerGuard<'_, M, E> {
    fn name(&self) -> &str {
        &self.inner.config.name
    }

    fn finish(mut self, outcome: ConsumeOutcome) -> CoordinatorResult<ConsumeReport> {
        self.armed = false;
        let mut report = std::mem::take(&mut self.report);
        report.outcome = outcome;

        self.inner.completion.raise(report.clone()).inspect_err(|_| {
            warn!(coordinator = %self.name(), "completion signal raised outside the consumer");
        })?;
        debug!(coordinator = %self.name(), outcome = ?report.outcome, "consumer completion raised");
        Ok(report)
    }
}

impl<M, E> Drop for ConsumerGuard<'_, M, E> {
    fn drop(&mut self) {
        if self.armed {
            warn!(coordinator = %self.name(), "consumer dropped before both streams closed");
            self.inner.messages_rx.disconnect();
            self.inner.errors_rx.disconnect();

            let mut report = std::mem::take(&mut self.report);
            report.outcome = ConsumeOutcome::Abandoned;
            let _ = self.inner.completion.raise(report);
        }
    }
}

/// Hands `item` to `handler` unless an earlier handler failed.
///
/// Returns whether the handler was called.
fn dispatch<T>(
    name: &str,
    handler: &mut impl FnMut(T),
    item: T,
    failure: &mut Option<String>,
) -> bool {
    if failure.is_some() {
        return false;
    }

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(item))) {
        let message = panic_message(&*payload);
        error!(coordinator = %name, %message, "consumer handler panicked, draining remaining items");
        *failure = Some(message);
    }
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
