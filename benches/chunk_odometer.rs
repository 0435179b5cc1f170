use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use dmrpp::array::ChunkOdometer;

fn chunk_odometer(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("chunk_odometer");
    group.plot_config(plot_config);

    for size in [64u64, 256, 1024] {
        let array_shape = vec![size; 3];
        let chunk_shape = vec![8; 3];
        let num_chunks = (size / 8).pow(3);
        group.throughput(Throughput::Elements(num_chunks));
        group.bench_function(BenchmarkId::new("enumerate", size), |b| {
            b.iter(|| {
                ChunkOdometer::new(chunk_shape.clone(), array_shape.clone())
                    .unwrap()
                    .count()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, chunk_odometer);
criterion_main!(benches);
