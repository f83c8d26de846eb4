use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ravenna::protocol::clock::{ClockOffsetEstimator, SubSamples, TimestampPair};
use ravenna::sync::SyncLoop;
use ravenna::testing::{MockRegister, MockTimestampSource, pair_with_offset};
use ravenna::types::SyncConfig;

fn estimator_benchmark(c: &mut Criterion) {
    // One hour of readings with a slowly walking phase
    let pairs: Vec<TimestampPair> = (0..3_600u64)
        .map(|s| pair_with_offset(1_700_000_000 + s, 48_000, u32::try_from(s / 600).unwrap()))
        .collect();

    c.bench_function("estimator_process_hour", |b| {
        b.iter(|| {
            let mut est = ClockOffsetEstimator::new(48_000, 0);
            let mut corrections = 0;
            for pair in &pairs {
                if est.process(black_box(*pair)).is_some() {
                    corrections += 1;
                }
            }
            corrections
        });
    });

    c.bench_function("subsamples_from_ptp_nanos", |b| {
        b.iter(|| SubSamples::from_ptp_nanos(black_box(1_700_000_000_123_456_789), 96_000));
    });

    c.bench_function("timestamp_parse_attribute", |b| {
        b.iter(|| {
            TimestampPair::parse_attribute(black_box("1700000000123456789 3141592653\n"), "bench")
                .unwrap()
        });
    });
}

fn sync_tick_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let config = SyncConfig::default();
    let config = &config;

    c.bench_function("sync_loop_tick", |b| {
        b.to_async(&rt).iter(|| async move {
            let source = MockTimestampSource::with_pairs([pair_with_offset(1, 48_000, 3)]);
            let mut sync = SyncLoop::new(source, MockRegister::new(0), config);
            sync.tick().await.unwrap()
        });
    });
}

criterion_group!(benches, estimator_benchmark, sync_tick_benchmark);
criterion_main!(benches);
