use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perceptual::{FingerprintConfig, Fingerprinter};

const LINE: &str = "2024-05-01T10:11:12Z WARN pool=db-primary conn 4412 idle for 301s, \
evicting from 10.0.3.17 (request_id=7c1e9a0b44f2)";

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for num_hashes in [64usize, 128, 256] {
        for parallel in [false, true] {
            let cfg = FingerprintConfig::default()
                .with_num_hashes(num_hashes)
                .with_bands(num_hashes / 4)
                .with_parallel(parallel);
            let Ok(fp) = Fingerprinter::new(cfg) else {
                continue;
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, num_hashes), &fp, |b, fp| {
                b.iter(|| fp.fingerprint(black_box(LINE)))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint);
criterion_main!(benches);
