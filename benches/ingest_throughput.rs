use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rrdb::{Algorithm, RrdConfig, Rrdb};

const TICKS: u64 = 10_000;

fn bench_single_dimension_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_dimension");
    group.throughput(Throughput::Elements(TICKS));

    group.bench_function("absolute_ticks", |b| {
        b.iter(|| {
            let rrdb = Rrdb::new(RrdConfig::default());
            let host = rrdb.find_or_create_host("bench-host", "00000000-0000-0000-0000-000000000000");
            let chart = rrdb
                .create_chart(&host, "bench.chart", "bench", "chart", "bench", "bench.chart", "count", 0, Some(1), Some(3600))
                .unwrap();
            chart.add_dim("dim", "dim", Algorithm::Absolute, 1, 1).unwrap();

            for t in 0..TICKS {
                let now_usec = black_box(t as i64) * 1_000_000;
                chart.set("dim", black_box(t as i64), now_usec).unwrap();
                black_box(rrdb.done(&chart, now_usec));
            }
        });
    });

    group.finish();
}

fn bench_wide_chart_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_chart");

    for dims in [8usize, 64, 256] {
        group.throughput(Throughput::Elements(TICKS * dims as u64));
        group.bench_with_input(BenchmarkId::from_parameter(dims), &dims, |b, &dims| {
            b.iter(|| {
                let rrdb = Rrdb::new(RrdConfig::default());
                let host = rrdb.find_or_create_host("bench-host", "00000000-0000-0000-0000-000000000001");
                let chart = rrdb
                    .create_chart(&host, "bench.wide", "bench", "wide", "bench", "bench.wide", "count", 0, Some(1), Some(3600))
                    .unwrap();
                for i in 0..dims {
                    chart.add_dim(&format!("dim{i}"), &format!("dim{i}"), Algorithm::Incremental, 1, 1).unwrap();
                }

                for t in 0..TICKS {
                    let now_usec = t as i64 * 1_000_000;
                    for i in 0..dims {
                        chart.set(&format!("dim{i}"), black_box(t as i64 * 1000), now_usec).unwrap();
                    }
                    black_box(rrdb.done(&chart, now_usec));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_dimension_commit, bench_wide_chart_commit);
criterion_main!(benches);
