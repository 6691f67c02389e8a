use std::io;

use tokio_mpsc_coordinator::{Coordinator, CoordinatorConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let parallelism = 10;
    let coordinator: Coordinator<String, io::Error> =
        Coordinator::with_config(CoordinatorConfig::new(parallelism).with_name("hello"));

    for i in 0..parallelism {
        let producer = coordinator.clone();
        tokio::spawn(async move {
            let _guard = producer.producer_guard();

            // Here the producer does its work
            if i % 4 == 3 {
                let err = io::Error::other(format!("producer {i} gave up"));
                if let Err(e) = producer.send_error(err).await {
                    tracing::error!("Error sending error: {}", e);
                }
                return;
            }

            if let Err(e) = producer
                .send_message([format!("Hello world from producer {i}!")])
                .await
            {
                tracing::error!("Error sending message: {}", e);
            }
        });
    }

    let consumer = coordinator.clone();
    tokio::spawn(async move {
        consumer
            .consume(
                |batch| {
                    for msg in batch {
                        tracing::info!("new message: {}", msg);
                    }
                },
                |err| tracing::warn!("error: {}", err),
            )
            .await
    });

    match coordinator.wait_and_close().await {
        Ok(report) => tracing::info!(
            "All done! {} messages, {} errors",
            report.messages,
            report.errors
        ),
        Err(e) => tracing::error!("Shutdown failed: {}", e),
    }
}
