use std::hint::black_box;

use tokio::sync::mpsc;

use crate::benchmark::{BenchmarkConfig, FanInBenchmark};

/// Benchmark implementation for tokio-mpsc channel
pub struct TokioMpscFanIn;

#[async_trait::async_trait]
impl FanInBenchmark for TokioMpscFanIn {
    async fn fan_in(config: &BenchmarkConfig) -> anyhow::Result<usize> {
        // Smallest capacity tokio allows, closest to a rendezvous
        let (sender, mut receiver) = mpsc::channel(1);
        let per_producer = config.messages_per_producer() as u32;

        for i in 0..config.num_producers as u32 {
            let sender = sender.clone();
            tokio::spawn(async move {
                let start = i * per_producer;
                for msg in start..start + per_producer {
                    if sender.send(black_box(msg)).await.is_err() {
                        break;
                    }
                }
            });
        }
        // mpsc channel closes when all senders are dropped
        drop(sender);

        let mut received = 0;
        while let Some(msg) = receiver.recv().await {
            black_box(msg);
            received += 1;
        }
        Ok(received)
    }
}
