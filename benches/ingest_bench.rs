use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use logdup::{build_engine, LogEntry, LogdupConfig};

fn batch(n: usize) -> Vec<LogEntry> {
    (0..n)
        .map(|i| {
            LogEntry::new(format!(
                "2024-05-01T10:11:{:02}Z WARN worker {} retried job {} after timeout talking to 10.0.{}.{}",
                i % 60,
                i % 7,
                i * 31,
                i % 5,
                i % 250
            ))
            .with_field("pod_name", format!("worker-{}", i % 4))
        })
        .collect()
}

fn bench_ingest(c: &mut Criterion) {
    let entries = batch(256);

    c.bench_function("ingest_256_fresh_store", |b| {
        b.iter_batched(
            || build_engine(&LogdupConfig::default()).expect("engine"),
            |engine| black_box(engine.ingest(&entries).expect("ingest")),
            BatchSize::SmallInput,
        );
    });

    let warm = build_engine(&LogdupConfig::default()).expect("engine");
    warm.ingest(&entries).expect("seed");
    c.bench_function("ingest_256_all_duplicates", |b| {
        b.iter(|| black_box(warm.ingest(&entries).expect("ingest")));
    });
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
