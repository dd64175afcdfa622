use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use graphsel_core::{
    Selector,
    configuration::Configuration,
    core::{
        element::{ElementType, Scalar},
        matrix::MatrixFormat,
        mock_matrices::random_matrix,
        select::{SelectOp, SelectOpKind},
    },
};

fn selector(threads: usize) -> Selector {
    Selector::new(Configuration {
        concurrent_threads: Some(threads),
        ..Default::default()
    })
    .unwrap()
}

// Thread scaling of a value predicate over a compressed matrix
fn bench_compressed_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("compressed_gt_thunk");
    let matrix = random_matrix(20_000, 20_000, 0.005, ElementType::F64, MatrixFormat::Compressed, 42).unwrap();
    let op = SelectOp::new(SelectOpKind::GtThunk, ElementType::F64);
    group.throughput(Throughput::Elements(matrix.nnz() as u64));

    for threads in [1usize, 2, 4, 8] {
        let pool = selector(threads);
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| pool.select(black_box(&matrix), &op, &Scalar::F64(0.0), threads).unwrap())
        });
    }

    group.finish();
}

// Iso output skips value writes entirely
fn bench_iso_vs_valued(c: &mut Criterion) {
    let mut group = c.benchmark_group("iso_vs_valued");
    let matrix = random_matrix(20_000, 20_000, 0.005, ElementType::I32, MatrixFormat::Compressed, 7).unwrap();
    let pool = selector(4);
    group.throughput(Throughput::Elements(matrix.nnz() as u64));

    for kind in [SelectOpKind::EqThunk, SelectOpKind::GeThunk] {
        let op = SelectOp::new(kind, ElementType::I32);
        group.bench_function(kind.name(), |b| {
            b.iter(|| pool.select(black_box(&matrix), &op, &Scalar::I32(1), 4).unwrap())
        });
    }

    group.finish();
}

fn bench_positional(c: &mut Criterion) {
    let mut group = c.benchmark_group("positional_tril");
    let pool = selector(4);
    let op = SelectOp::new(SelectOpKind::Tril, ElementType::U8);

    for format in [MatrixFormat::Compressed, MatrixFormat::Bitmap] {
        let matrix = random_matrix(2_000, 2_000, 0.05, ElementType::U8, format, 3).unwrap();
        group.bench_function(format!("{:?}", format), |b| {
            b.iter(|| pool.select(black_box(&matrix), &op, &Scalar::I64(0), 4).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compressed_threads, bench_iso_vs_valued, bench_positional);
criterion_main!(benches);
