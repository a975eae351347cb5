// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bildwerk-media crate. Benchmarks the
// size-targeting search and a two-image merge on small synthetic images.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};

use bildwerk_core::types::{MergeDirection, MergeOptions, OutputFormat, RgbColor};
use bildwerk_media::{ImageCodec, compress_to_target, merge_images};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn textured_codec(width: u32, height: u32) -> ImageCodec {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let noise = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 97;
        Rgba([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            noise as u8,
            255,
        ])
    });
    ImageCodec::from_dynamic(DynamicImage::ImageRgba8(img))
}

/// Benchmark the 7-probe quality search on a 200x150 textured image with a
/// mid-range byte budget — the realistic hot path for size-targeted batch
/// conversions.
fn bench_compress_to_target(c: &mut Criterion) {
    let codec = textured_codec(200, 150);

    c.bench_function("compress_to_target jpeg (200x150)", |b| {
        b.iter(|| {
            let result =
                compress_to_target(black_box(&codec), OutputFormat::Jpeg, 8 * 1024).unwrap();
            black_box(result.bytes);
        });
    });
}

/// Benchmark a horizontal two-image merge including the final PNG encode.
fn bench_merge_horizontal(c: &mut Criterion) {
    let images = [textured_codec(160, 120), textured_codec(160, 120)];
    let options = MergeOptions {
        direction: MergeDirection::Horizontal,
        spacing: 8,
        background: RgbColor::WHITE,
        format: OutputFormat::Png,
        quality: 80,
    };

    c.bench_function("merge_images horizontal (2x 160x120)", |b| {
        b.iter(|| {
            let merged = merge_images(black_box(&images), &options).unwrap();
            black_box(merged.bytes);
        });
    });
}

criterion_group!(benches, bench_compress_to_target, bench_merge_horizontal);
criterion_main!(benches);
