use std::hint::black_box;

use crate::benchmark::{BenchmarkConfig, FanInBenchmark};

/// Benchmark implementation for flume rendezvous channel
pub struct FlumeFanIn;

#[async_trait::async_trait]
impl FanInBenchmark for FlumeFanIn {
    async fn fan_in(config: &BenchmarkConfig) -> anyhow::Result<usize> {
        let (sender, receiver) = flume::bounded(0);
        let per_producer = config.messages_per_producer() as u32;

        for i in 0..config.num_producers as u32 {
            let sender = sender.clone();
            tokio::spawn(async move {
                let start = i * per_producer;
                for msg in start..start + per_producer {
                    if sender.send_async(black_box(msg)).await.is_err() {
                        break;
                    }
                }
            });
        }
        // flume channel closes when all senders are dropped
        drop(sender);

        let mut received = 0;
        while let Ok(msg) = receiver.recv_async().await {
            black_box(msg);
            received += 1;
        }
        Ok(received)
    }
}
