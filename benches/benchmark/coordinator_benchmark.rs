use std::hint::black_box;

use tokio_mpsc_coordinator::{Coordinator, CoordinatorResult};

use crate::benchmark::{BenchmarkConfig, FanInBenchmark};

/// Benchmark implementation for the coordinator
pub struct CoordinatorFanIn;

#[async_trait::async_trait]
impl FanInBenchmark for CoordinatorFanIn {
    async fn fan_in(config: &BenchmarkConfig) -> anyhow::Result<usize> {
        let coordinator: Coordinator<u32, String> = Coordinator::new(config.num_producers);
        let per_producer = config.messages_per_producer() as u32;

        for i in 0..config.num_producers as u32 {
            let producer = coordinator.clone();
            tokio::spawn(async move {
                let _guard = producer.producer_guard();
                let start = i * per_producer;
                for msg in start..start + per_producer {
                    producer.send_message([black_box(msg)]).await?;
                }
                CoordinatorResult::Ok(())
            });
        }

        let consumer = coordinator.clone();
        tokio::spawn(async move {
            consumer
                .consume(
                    |batch| {
                        black_box(batch);
                    },
                    |_| {},
                )
                .await
        });

        let report = coordinator.wait_and_close().await?;
        Ok(report.messages)
    }
}
