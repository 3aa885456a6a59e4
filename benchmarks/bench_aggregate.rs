use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use keystat::aggregate::{aggregate_bytes, merge_maps, tree_merge, AggregateMap};
use keystat::config::MergeStrategy;
use keystat::formatters::{format_map, FormatOptions};
use keystat::parallel::{ParallelConfig, ParallelProcessor};
use keystat::parsers::parse_line;
use keystat::partition::ChunkSizing;
use keystat::readers::MemorySource;

const STATIONS: &[&str] = &[
    "Abha", "Abidjan", "Accra", "Addis Ababa", "Adelaide", "Aden", "Ahvaz", "Albuquerque",
    "Alexandria", "Algiers", "Alice Springs", "Almaty", "Amsterdam", "Anadyr", "Anchorage",
    "Andorra la Vella", "Ankara", "Antananarivo", "Antsiranana", "Arkhangelsk", "Ashgabat",
    "Asmara", "Assab", "Astana", "Athens", "Atlanta", "Auckland", "Austin", "Baghdad", "Baguio",
];

fn measurements(lines: usize, mut seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(lines * 16);
    for _ in 0..lines {
        // xorshift64
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let station = STATIONS[(seed % STATIONS.len() as u64) as usize];
        let tenths = (seed >> 32) % 1999;
        let value = tenths as f64 / 10.0 - 99.9;
        data.extend_from_slice(format!("{};{:.1}\n", station, value).as_bytes());
    }
    data
}

fn bench_parse_line(c: &mut Criterion) {
    c.bench_function("parse_line", |b| {
        b.iter(|| {
            black_box(parse_line(black_box(b"Alice Springs;-12.3")).ok());
        });
    });
}

fn bench_sequential_fold(c: &mut Criterion) {
    let data = measurements(200_000, 0x2545_f491_4f6c_dd1d);
    let mut group = c.benchmark_group("sequential_fold");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("aggregate_bytes", |b| {
        b.iter(|| black_box(aggregate_bytes(black_box(&data))));
    });
    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let data = measurements(1_000_000, 0x9e37_79b9_7f4a_7c15);
    let mut group = c.benchmark_group("parallel");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    for workers in [1usize, 2, 4, 8] {
        for merge in [MergeStrategy::Incremental, MergeStrategy::Tree] {
            let processor = ParallelProcessor::new(ParallelConfig {
                num_workers: workers,
                sizing: ChunkSizing {
                    min_bytes: 64 * 1024,
                    max_bytes: 4 * 1024 * 1024,
                },
                merge,
                buffer_size: workers * 2,
            });
            let source = Arc::new(MemorySource::new(data.clone()));
            let id = BenchmarkId::new(format!("{:?}", merge).to_lowercase(), workers);
            group.bench_with_input(id, &workers, |b, _| {
                b.iter(|| {
                    let result = processor.process_source(source.clone());
                    black_box(result.map(|a| a.map.len()).ok());
                });
            });
        }
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let maps: Vec<AggregateMap> = (0..16u64)
        .map(|i| aggregate_bytes(&measurements(25_000, 0x1234_5678 + i)))
        .collect();

    c.bench_function("merge_incremental_16", |b| {
        b.iter(|| {
            let merged = maps.iter().cloned().fold(AggregateMap::new(), merge_maps);
            black_box(merged.len())
        });
    });
    c.bench_function("merge_tree_16", |b| {
        b.iter(|| black_box(tree_merge(maps.clone()).len()));
    });
}

fn bench_format(c: &mut Criterion) {
    let map = aggregate_bytes(&measurements(100_000, 42));
    c.bench_function("format_map", |b| {
        b.iter(|| black_box(format_map(black_box(&map), FormatOptions::default())));
    });
}

criterion_group!(
    benches,
    bench_parse_line,
    bench_sequential_fold,
    bench_parallel,
    bench_merge,
    bench_format
);
criterion_main!(benches);
