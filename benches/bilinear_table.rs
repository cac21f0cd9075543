use criterion::{criterion_group, criterion_main, Criterion};
use pvlut::algorithms::extremum::bisect_max;
use pvlut::tables::bilinear::BilinearTable;

fn build_table() -> BilinearTable
{
    let mut table = BilinearTable::new();
    table.set_x_range(0.0, 10.0, 128);
    table.set_y_range(0.0, 100.0, 64);
    table.set_sampler(|x, y| (x * x + 1.0) * (1.0 - y / 200.0));
    table
}

fn run_queries(c: &mut Criterion)
{
    let table = build_table();
    let points: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64 * 0.01, i as f64 * 0.1]).collect();
    c.bench_function("interpolate_batch", |b| b.iter(|| table.interpolate_batch(&points)));
    c.bench_function("interpolate", |b|
    {
        b.iter(||
        {
            let mut acc = 0.0;
            for point in &points
            {
                acc += table.interpolate_or_zero(point[0], point[1]);
            }
            acc
        })
    });
}

fn run_search(c: &mut Criterion)
{
    c.bench_function("bisect_max", |b| b.iter(|| bisect_max(0.0, 10.0, 1e-9, |x: f64| -(x - 7.0) * (x - 7.0))));
}

criterion_group!(benches, run_queries, run_search);
criterion_main!(benches);
