//! # tokio-mpsc-coordinator
//!
//! A multi-producer single-consumer (MPSC) coordinator based on Tokio.
//!
//! Any number of producer tasks send message batches and errors into a shared
//! [`Coordinator`]; exactly one consumer task drains both streams until every producer has
//! signaled completion and the streams are closed; the orchestrating task joins on
//! [`Coordinator::wait_and_close`], which returns only once nothing is left in flight.
//!
//! ## Features
//!
//! - Asynchronous implementation based on Tokio
//! - Producer completion tracking with a countdown barrier
//! - Rendezvous streams: a send completes when the consumer takes it
//! - Fair multiplexing of the message and error streams
//! - Shutdown that never closes a stream while a producer may still send
//! - Misuse reported as errors instead of panics or silent deadlocks
//!
//! ## Usage Example
//!
//! ```rust
//! use std::collections::HashSet;
//!
//! use tokio_mpsc_coordinator::Coordinator;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator: Coordinator<String, std::io::Error> = Coordinator::new(3);
//!
//!     for i in 0..3 {
//!         let producer = coordinator.clone();
//!         tokio::spawn(async move {
//!             if let Err(e) = producer.send_message_and_complete([format!("hello-{i}")]).await {
//!                 eprintln!("Send failed: {}", e);
//!             }
//!         });
//!     }
//!
//!     let consumer = coordinator.clone();
//!     let consumer_task = tokio::spawn(async move {
//!         let mut seen = HashSet::new();
//!         let result = consumer
//!             .consume(|batch| seen.extend(batch), |err| eprintln!("error: {}", err))
//!             .await;
//!         (result, seen)
//!     });
//!
//!     match coordinator.wait_and_close().await {
//!         Ok(report) => println!("Consumed {} messages", report.messages),
//!         Err(e) => eprintln!("Shutdown failed: {}", e),
//!     }
//!
//!     let (_, seen) = consumer_task.await.unwrap();
//!     assert_eq!(seen.len(), 3);
//! }
//! ```
//!
//! The raw primitives are exported for callers composing their own loops:
//! [`ProducerBarrier`], the rendezvous [`channel`] and [`CompletionSignal`].

mod barrier;
mod channel;
mod config;
mod coordinator;
mod errors;
mod signal;

pub use barrier::ProducerBarrier;
pub use channel::{Receiver, Sender, channel};
pub use config::{CoordinatorConfig, DEFAULT_NAME};
pub use coordinator::{BoxError, Coordinator, ProducerGuard, StreamState};
pub use errors::{ChannelError, CoordinatorError};
pub use signal::{CompletionSignal, ConsumeOutcome, ConsumeReport};

/// Represents the result type for channel operations
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
/// Represents the result type for coordinator operations
pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;
