// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the faltwerk-rectify crate. Covers the two hot
// paths: quadrilateral detection on a small synthetic photo and a full grid
// straightening warp through the software resampler.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

use faltwerk_rectify::{DetectorOptions, GridStraightener, detect_document_quads, generate_regular_grid};
use faltwerk_warp::SoftwareWarper;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark quadrilateral detection on a 100x100 synthetic grayscale image.
///
/// Creates a small image with a white rectangle on a dark background (the
/// same pattern used in the detection unit tests) and runs the full
/// blur/canny/contour pipeline. Small, but every stage executes, so this
/// tracks regressions in the per-pixel passes.
fn bench_quad_detection(c: &mut Criterion) {
    // Build a 100x100 synthetic image: dark background with a white
    // rectangle from (15, 15) to (85, 85).
    let (width, height) = (100u32, 100u32);
    let mut img = GrayImage::from_pixel(width, height, Luma([30u8]));
    for y in 15..85 {
        for x in 15..85 {
            img.put_pixel(x, y, Luma([240u8]));
        }
    }
    let dynamic = DynamicImage::ImageLuma8(img);
    let options = DetectorOptions::default();

    c.bench_function("quad_detection (100x100)", |b| {
        b.iter(|| {
            let result = detect_document_quads(black_box(&dynamic), &options);
            black_box(result);
        });
    });
}

/// Benchmark a full 4x4 grid straightening of a 64x64 RGBA image.
///
/// The grid is regular, so the fitted polynomial is near-identity and the
/// cost is dominated by the backward-mapping resample -- the same work every
/// corrector ends in.
fn bench_grid_straighten(c: &mut Criterion) {
    let (width, height) = (64u32, 64u32);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 3 % 256) as u8, (y * 3 % 256) as u8, 96, 255])
    });
    let dynamic = DynamicImage::ImageRgba8(img);
    let grid = generate_regular_grid(63.0, 63.0, 4, 4);

    c.bench_function("grid_straighten (64x64, 4x4)", |b| {
        b.iter(|| {
            let corrector =
                GridStraightener::from_dynamic(black_box(dynamic.clone()), &SoftwareWarper);
            let result = corrector.correct(4, 4, &grid, &grid, 1.0);
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_quad_detection, bench_grid_straighten);
criterion_main!(benches);
