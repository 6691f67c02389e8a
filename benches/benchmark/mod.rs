use std::time::Duration;

pub mod coordinator_benchmark;
pub mod flume_benchmark;
pub mod tokio_mpsc_benchmark;

/// Common behavior for fan-in benchmarking: many producers, one consumer
#[async_trait::async_trait]
pub trait FanInBenchmark {
    /// Run every producer into a single consumer, returning the number of messages consumed
    async fn fan_in(config: &BenchmarkConfig) -> anyhow::Result<usize>;
}

/// Define benchmark configuration parameters
pub struct BenchmarkConfig {
    pub total_messages: usize,
    pub num_producers: usize,
    pub sample_size: usize,
    pub measurement_time: Duration,
    pub warm_up_time: Duration,
}

impl BenchmarkConfig {
    pub fn messages_per_producer(&self) -> usize {
        self.total_messages / self.num_producers
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            total_messages: 10_000,
            num_producers: 8,
            sample_size: 10,
            measurement_time: Duration::from_secs(15),
            warm_up_time: Duration::from_secs(2),
        }
    }
}

/// Run a fan-in benchmark and check nothing was lost
pub async fn run_fan_in_benchmark<B: FanInBenchmark>(config: &BenchmarkConfig) {
    let consumed = B::fan_in(config).await.expect("fan-in benchmark failed");
    assert_eq!(
        consumed,
        config.messages_per_producer() * config.num_producers
    );
}
