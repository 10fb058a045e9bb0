//! Benchmarks for `StreamExtractor`'s O(n²) LAS search.
//!
//! Simulates realistic stream sizes: a short burst (a handful of
//! keystrokes before abandoning a search), a typical query, and a long
//! multi-word query typed slowly.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use queryscope::extractor::extract;
use queryscope::packet::PacketObservation;
use queryscope::site_profile::lookup;

struct StreamSize {
    name: &'static str,
    keystrokes: usize,
}

const STREAM_SIZES: &[StreamSize] = &[
    StreamSize { name: "short", keystrokes: 5 },
    StreamSize { name: "typical", keystrokes: 20 },
    StreamSize { name: "long", keystrokes: 80 },
];

fn synthetic_stream(n: usize) -> Vec<PacketObservation> {
    (0..n)
        .map(|i| PacketObservation {
            time_ms: i as i64 * 150,
            stream_id: 0,
            size_bytes: 500 + i as i32,
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let site = lookup("google").unwrap();
    let mut group = c.benchmark_group("stream_extractor");

    for size in STREAM_SIZES {
        let packets = synthetic_stream(size.keystrokes);
        group.throughput(Throughput::Elements(size.keystrokes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size.name), &packets, |b, packets| {
            b.iter(|| black_box(extract(&site, packets)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
