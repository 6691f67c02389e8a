use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering, fence};

use crossbeam_queue::ArrayQueue;
use tokio::sync::{Notify, oneshot};

use crate::{ChannelError, ChannelResult};

/// Creates a rendezvous channel for communicating between asynchronous tasks.
///
/// The channel has no buffering: a call to [`Sender::send`] returns only once the
/// [`Receiver`] has taken the value, so a slow receiver stalls every sender. Any number of
/// senders may share the channel; there is a single receiver.
///
/// The channel is closed explicitly with [`Sender::close`]. Dropping handles does not close it.
///
/// # Examples
///
/// ```rust
/// use tokio_mpsc_coordinator::channel;
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, rx) = channel();
///
///     let producer = tx.clone();
///     let send_task = tokio::spawn(async move { producer.send("Hello").await });
///
///     // The sender stays suspended until the value is received
///     match rx.recv().await {
///         Some(msg) => println!("Received message: {}", msg),
///         None => println!("Channel is closed"),
///     }
///     assert!(send_task.await.unwrap().is_ok());
///
///     tx.close();
///     assert_eq!(rx.recv().await, None);
/// }
/// ```
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Inner {
        slot: ArrayQueue::new(1),
        is_closed: AtomicBool::new(false),
        is_drained: AtomicBool::new(false),
        producer_waiters: Notify::new(),
        consumer_waiters: Notify::new(),
    });

    let sender = Sender {
        inner: inner.clone(),
    };
    let receiver = Receiver { inner };

    (sender, receiver)
}

/// A value in transit together with the acknowledgement its sender is waiting on.
struct Envelope<T> {
    value: T,
    ack: oneshot::Sender<()>,
}

/// The state shared by both halves of the channel.
struct Inner<T> {
    /// Handoff slot. Holds at most one value whose sender has not been acknowledged yet.
    slot: ArrayQueue<Envelope<T>>,
    /// Set once by `close`. No new value enters the slot afterwards.
    is_closed: AtomicBool,
    /// Set by the receiver once it has observed the channel closed and empty, or once it has
    /// been disconnected. A sender that still lands a value after this point takes it back out.
    is_drained: AtomicBool,
    /// Senders waiting for the slot to free up.
    producer_waiters: Notify,
    /// The receiver waiting for a value or for the close.
    consumer_waiters: Notify,
}

/// The sending half of the channel.
///
/// It can be cloned to send from multiple tasks.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
}

/// The receiving half of the channel.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Sender<T> {
    /// Sends `value` and waits until the receiver has taken it.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the receiver holds the value.
    /// `Err(ChannelError::ChannelClosed)` if the channel was closed before the value could be
    /// handed over. The value is dropped in that case.
    pub async fn send(&self, value: T) -> ChannelResult<()> {
        let (ack, delivered) = oneshot::channel();
        let mut envelope = Envelope { value, ack };

        loop {
            let notified = self.inner.producer_waiters.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.is_closed.load(Ordering::Acquire)
                || self.inner.is_drained.load(Ordering::Acquire)
            {
                return Err(ChannelError::ChannelClosed);
            }

            match self.inner.slot.push(envelope) {
                Ok(()) => break,
                Err(rejected) => {
                    // Another sender holds the slot
                    envelope = rejected;
                    notified.await;
                }
            }
        }

        self.inner.consumer_waiters.notify_one();

        // Pairs with the fence in `Receiver::recv`: either the receiver sees our value or we
        // see that it has stopped receiving.
        fence(Ordering::SeqCst);
        if self.inner.is_drained.load(Ordering::SeqCst) {
            drop(self.inner.slot.pop());
        }

        delivered.await.map_err(|_| ChannelError::ChannelClosed)
    }

    /// Closes the channel.
    ///
    /// Senders waiting for the slot return `Err(ChannelError::ChannelClosed)`. The receiver
    /// still takes a value already in the slot, then returns `None`.
    ///
    /// # Returns
    ///
    /// `true` if this call closed the channel, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let first = !self.inner.is_closed.swap(true, Ordering::AcqRel);
        self.inner.producer_waiters.notify_waiters();
        self.inner.consumer_waiters.notify_waiters();
        first
    }

    /// Checks if the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed.load(Ordering::Acquire)
    }

    /// Checks if no value is waiting to be received.
    pub fn is_empty(&self) -> bool {
        self.inner.slot.is_empty()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Receiver<T> {
    /// Receives a value from the channel, releasing the sender that handed it over.
    ///
    /// If no value is available, the calling task is suspended until a sender arrives or the
    /// channel is closed.
    ///
    /// This method is cancel safe: a value is only taken out of the slot when it is returned.
    ///
    /// # Returns
    ///
    /// `Some(value)` if a value was received.
    /// `None` if the channel is closed and no value is pending.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let notified = self.inner.consumer_waiters.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(envelope) = self.inner.slot.pop() {
                return Some(self.accept(envelope));
            }

            if self.inner.is_closed.load(Ordering::Acquire) {
                self.inner.is_drained.store(true, Ordering::SeqCst);
                fence(Ordering::SeqCst);
                // Last look for a sender that slipped in before the close
                return self.inner.slot.pop().map(|envelope| self.accept(envelope));
            }

            notified.await;
        }
    }

    /// Stops receiving for good.
    ///
    /// The value pending in the slot is dropped and its sender, like every sender waiting for
    /// the slot or arriving later, returns `Err(ChannelError::ChannelClosed)`.
    pub fn disconnect(&self) {
        self.inner.is_drained.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        while let Some(envelope) = self.inner.slot.pop() {
            drop(envelope);
        }
        self.inner.producer_waiters.notify_waiters();
    }

    fn accept(&self, envelope: Envelope<T>) -> T {
        self.inner.producer_waiters.notify_one();
        // The sender may have been cancelled; the value is still delivered.
        let _ = envelope.ack.send(());
        envelope.value
    }

    /// Checks if the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed.load(Ordering::Acquire)
    }

    /// Checks if no value is waiting to be received.
    pub fn is_empty(&self) -> bool {
        self.inner.slot.is_empty()
    }
}
