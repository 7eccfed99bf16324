//! Entropy decoder benchmarks
//!
//! Decode-table construction runs for every embedded model (up to ten per
//! file), and bit extraction dominates palette and block-stream decoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use crnd::codec::{BitReader, DecoderTables};

fn table_build_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder_tables");

    // A skewed 256-symbol code: two short codes, a long maximum-length tail.
    let mut skewed = vec![16u8; 256];
    skewed[0] = 1;
    skewed[1] = 2;
    group.bench_function("skewed_256", |b| {
        b.iter(|| DecoderTables::build(black_box(&skewed)).unwrap())
    });

    // A flat 8-bit alphabet builds the full direct lookup table.
    let flat = vec![8u8; 256];
    group.bench_function("flat_256", |b| {
        b.iter(|| DecoderTables::build(black_box(&flat)).unwrap())
    });

    group.finish();
}

fn bit_reader_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_reader");

    let data: Vec<u8> = (0..64 << 10).map(|i| (i * 131 + 13) as u8).collect();
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("get_bits_mixed", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(black_box(&data)).unwrap();
            let mut acc = 0u32;
            // 13 + 3 bits per iteration, two bytes per pass.
            for _ in 0..(data.len() / 2) {
                acc = acc.wrapping_add(reader.decode_bits(13));
                acc = acc.wrapping_add(reader.decode_bits(3));
            }
            acc
        })
    });

    group.finish();
}

criterion_group!(benches, table_build_benchmarks, bit_reader_benchmarks);
criterion_main!(benches);
