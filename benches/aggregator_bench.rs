use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use ship_stabilization::component_b::request::{Angle, RequestAggregator};

fn aggregator_resolve_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregator_resolve");

    for n in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("scalar", n), &n, |b, &n| {
            let mut agg = RequestAggregator::<f64>::new();
            b.iter(|| {
                for i in 0..n {
                    agg.submit(i as f64 / n as f64, 1.0 + i as f64);
                }
                black_box(agg.resolve());
            })
        });

        group.bench_with_input(BenchmarkId::new("angle", n), &n, |b, &n| {
            let mut agg = RequestAggregator::<Angle>::new();
            b.iter(|| {
                for i in 0..n {
                    agg.submit(Angle(350.0 + i as f64 * 3.0), 1.0);
                }
                black_box(agg.resolve());
            })
        });
    }

    group.finish();
}

criterion_group!(benches, aggregator_resolve_bench);
criterion_main!(benches);
