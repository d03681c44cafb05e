//! Compression benchmarks for kdpack

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kdpack_core::{compress_points, compress_symbols, decompress_points, decompress_symbols};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BIT_LENGTH: u32 = 12;

/// Small skewed values, the typical output of a predictor
fn sample_residuals(count: usize) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let v: f64 = rng.gen::<f64>();
            (v * v * v * 200.0) as u32
        })
        .collect()
}

/// Points scattered around a few cluster centers
fn sample_cloud(count: usize) -> Vec<[u32; 3]> {
    let mut rng = StdRng::seed_from_u64(7);
    let max = (1u32 << BIT_LENGTH) - 1;
    let centers: Vec<[u32; 3]> = (0..16)
        .map(|_| [rng.gen_range(0..=max), rng.gen_range(0..=max), rng.gen_range(0..=max)])
        .collect();
    (0..count)
        .map(|i| {
            let c = centers[i % centers.len()];
            let jitter = |v: u32, d: i32| (v as i32 + d).clamp(0, max as i32) as u32;
            [
                jitter(c[0], rng.gen_range(-40..40)),
                jitter(c[1], rng.gen_range(-40..40)),
                jitter(c[2], rng.gen_range(-40..40)),
            ]
        })
        .collect()
}

fn bench_symbols(c: &mut Criterion) {
    let data = sample_residuals(100_000);
    let mut group = c.benchmark_group("symbols");
    group.throughput(Throughput::Bytes((data.len() * 4) as u64));

    for level in [0u8, 7, 10] {
        group.bench_with_input(BenchmarkId::new("encode", level), &level, |b, &level| {
            b.iter(|| compress_symbols(black_box(&data), 1, level))
        });
    }

    let compressed = compress_symbols(&data, 1, 7).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| decompress_symbols(black_box(&compressed), data.len(), 1))
    });

    group.finish();
}

fn bench_points(c: &mut Criterion) {
    let cloud = sample_cloud(50_000);
    let mut group = c.benchmark_group("points");
    group.throughput(Throughput::Elements(cloud.len() as u64));

    for level in [0u8, 4, 6, 7, 8] {
        group.bench_with_input(BenchmarkId::new("encode", level), &level, |b, &level| {
            b.iter(|| compress_points(black_box(&cloud), 3, BIT_LENGTH, level))
        });

        let compressed = compress_points(&cloud, 3, BIT_LENGTH, level).unwrap();
        group.bench_with_input(BenchmarkId::new("decode", level), &level, |b, &level| {
            b.iter(|| decompress_points(black_box(&compressed), 3, level, cloud.len() as u32))
        });
    }

    group.finish();
}

fn print_compression_ratios(_c: &mut Criterion) {
    let cloud = sample_cloud(50_000);
    let raw_size = cloud.len() * 3 * BIT_LENGTH as usize / 8;

    println!("\n=== Point Cloud Compression ===\n");
    println!("{:<8} {:>10} {:>8}", "Level", "Bytes", "Ratio");
    for level in 0..=8u8 {
        if let Ok(compressed) = compress_points(&cloud, 3, BIT_LENGTH, level) {
            println!(
                "{:<8} {:>10} {:>7.1}%",
                level,
                compressed.len(),
                compressed.len() as f64 / raw_size as f64 * 100.0
            );
        }
    }

    let residuals = sample_residuals(100_000);
    if let Ok(compressed) = compress_symbols(&residuals, 1, 7) {
        println!(
            "\nresiduals: {} values -> {} bytes",
            residuals.len(),
            compressed.len()
        );
    }
}

criterion_group!(benches, bench_symbols, bench_points, print_compression_ratios);
criterion_main!(benches);
