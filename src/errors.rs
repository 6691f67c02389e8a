use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel is closed")]
    ChannelClosed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("Producer completion signaled more than the {expected} registered producers")]
    ProducerOverflow { expected: usize },
    #[error("Coordinator is already closed")]
    AlreadyClosed,
    #[error("A consumer is already running on this coordinator")]
    ConsumerAlreadyRunning,
    #[error("Consumer handler panicked: {message}")]
    HandlerPanicked { message: String },
    #[error("Consumer was dropped before draining both streams")]
    ConsumerAbandoned,
    #[error("Completion signal was already raised")]
    SignalAlreadyRaised,
    #[error("Shutdown did not complete within {elapsed:?}")]
    ShutdownTimeout { elapsed: Duration },
}
