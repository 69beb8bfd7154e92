//! Benchmarks for pipeline updates
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vispipe_rs::pipeline::nodes::{ConstantSource, PassThrough, RampSource, Scale};
use vispipe_rs::pipeline::{Coordinator, PortId};
use vispipe_rs::types::Extent;

fn scale_chain(length: usize) -> (Coordinator, PortId) {
    let mut pipeline = Coordinator::new();
    let source = pipeline.add_algorithm(ConstantSource::new(vec![1.0; 64]));
    let mut prev = source;
    for _ in 0..length {
        let next = pipeline.add_algorithm(Scale::new(1.0001));
        let from = pipeline.output_port(prev, 0).unwrap();
        let to = pipeline.input_port(next, 0).unwrap();
        pipeline.connect(from, to).unwrap();
        prev = next;
    }
    let port = pipeline.output_port(prev, 0).unwrap();
    (pipeline, port)
}

fn image_pipeline(n: i64) -> (Coordinator, PortId) {
    let mut pipeline = Coordinator::new();
    let ramp = pipeline.add_algorithm(RampSource::new(Extent::new(0, n - 1, 0, n - 1, 0, 0)));
    let pass = pipeline.add_algorithm(PassThrough::new().with_ghost_margin(1));
    let from = pipeline.output_port(ramp, 0).unwrap();
    let to = pipeline.input_port(pass, 0).unwrap();
    pipeline.connect(from, to).unwrap();
    let port = pipeline.output_port(pass, 0).unwrap();
    (pipeline, port)
}

fn bench_cached_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_update");

    for length in [1, 10, 100].iter() {
        let (mut pipeline, port) = scale_chain(*length);
        pipeline.update(port);
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::new("chain", length), length, |b, _| {
            b.iter(|| black_box(pipeline.update(port)));
        });
    }

    group.finish();
}

fn bench_modified_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("modified_source");

    for length in [1, 10, 100].iter() {
        let (mut pipeline, port) = scale_chain(*length);
        let source = pipeline.plan(port).sources[0];
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::new("chain", length), length, |b, _| {
            b.iter(|| {
                pipeline.modified(source).unwrap();
                black_box(pipeline.update(port))
            });
        });
    }

    group.finish();
}

fn bench_streamed_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("streamed_image");

    for pieces in [1usize, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::new("256x256", pieces), pieces, |b, &pieces| {
            b.iter(|| {
                let (mut pipeline, port) = image_pipeline(256);
                black_box(pipeline.update_streamed(port, pieces))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cached_update, bench_modified_source, bench_streamed_image);
criterion_main!(benches);
