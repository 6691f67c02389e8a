use criterion::{Criterion, criterion_group, criterion_main};
use tokio_test::block_on;

mod benchmark;

use benchmark::BenchmarkConfig;
use benchmark::coordinator_benchmark::CoordinatorFanIn;
use benchmark::flume_benchmark::FlumeFanIn;
use benchmark::tokio_mpsc_benchmark::TokioMpscFanIn;

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan-in-comparison");
    let config = BenchmarkConfig::default();

    // Configure benchmark group
    group.sample_size(config.sample_size);
    group.measurement_time(config.measurement_time);
    group.warm_up_time(config.warm_up_time);

    group.bench_function("coordinator", |b| {
        b.iter(|| block_on(benchmark::run_fan_in_benchmark::<CoordinatorFanIn>(&config)));
    });

    group.bench_function("tokio-mpsc-channel", |b| {
        b.iter(|| block_on(benchmark::run_fan_in_benchmark::<TokioMpscFanIn>(&config)));
    });

    group.bench_function("flume-rendezvous", |b| {
        b.iter(|| block_on(benchmark::run_fan_in_benchmark::<FlumeFanIn>(&config)));
    });

    group.finish();
}

criterion_group!(benches, bench_fan_in);
criterion_main!(benches);
