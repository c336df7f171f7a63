// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The warp backend trait and the built-in software implementation.
//
// Every corrector drives its geometry through this seam, so tests can swap
// in a recording backend and hardware-accelerated implementations can slot
// in without touching the correction pipelines.

use faltwerk_core::error::{FaltwerkError, Result};
use faltwerk_core::geometry::ControlPointPair;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::{debug, instrument};

use crate::homography::Homography;
use crate::polynomial::PolynomialMap;
use crate::types::{Viewport, VirtualPixel};

/// A control-point warp backend.
///
/// Both methods fit a destination-to-source mapping to the given pairs and
/// resample the source image through it, producing a raster of the
/// viewport's size. Output is always RGBA; callers convert back to the
/// colour model they need.
pub trait Warper {
    /// Warp through a bivariate polynomial of the given order.
    /// Needs at least `(order + 1) * (order + 2) / 2` control-point pairs.
    fn warp_polynomial(
        &self,
        image: &DynamicImage,
        order: u32,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage>;

    /// Warp through a perspective transform. Needs exactly 4 pairs.
    fn warp_perspective(
        &self,
        image: &DynamicImage,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage>;
}

/// Pure-CPU warp backend with bilinear resampling.
///
/// Walks every viewport pixel, maps it back into source coordinates, and
/// blends the four surrounding source pixels. No SIMD, no tiling; at
/// document-photo sizes this is comfortably fast enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareWarper;

impl Warper for SoftwareWarper {
    #[instrument(skip_all, fields(order, pairs = pairs.len(), w = viewport.width, h = viewport.height))]
    fn warp_polynomial(
        &self,
        image: &DynamicImage,
        order: u32,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage> {
        check_viewport(viewport)?;
        let map = PolynomialMap::fit(order, pairs)?;
        let source = image.to_rgba8();
        debug!(order = map.order(), "polynomial map fitted");
        Ok(resample(&source, viewport, policy, |x, y| map.apply(x, y)))
    }

    #[instrument(skip_all, fields(pairs = pairs.len(), w = viewport.width, h = viewport.height))]
    fn warp_perspective(
        &self,
        image: &DynamicImage,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage> {
        check_viewport(viewport)?;
        let homography = Homography::from_pairs(pairs)?;
        let source = image.to_rgba8();
        Ok(resample(&source, viewport, policy, |x, y| {
            homography.apply(x, y)
        }))
    }
}

fn check_viewport(viewport: Viewport) -> Result<()> {
    if viewport.width == 0 || viewport.height == 0 {
        return Err(FaltwerkError::Warp(format!(
            "empty warp viewport ({}x{})",
            viewport.width, viewport.height
        )));
    }
    Ok(())
}

/// Backward-map every viewport pixel through `map` and sample the source.
fn resample(
    source: &RgbaImage,
    viewport: Viewport,
    policy: VirtualPixel,
    map: impl Fn(f64, f64) -> (f64, f64),
) -> RgbaImage {
    let mut out = RgbaImage::new(viewport.width, viewport.height);
    for row in 0..viewport.height {
        for col in 0..viewport.width {
            let dx = (viewport.x_offset + i64::from(col)) as f64;
            let dy = (viewport.y_offset + i64::from(row)) as f64;
            let (sx, sy) = map(dx, dy);
            out.put_pixel(col, row, sample_bilinear(source, sx, sy, policy));
        }
    }
    out
}

/// Sample the source at a fractional coordinate with the given fill policy.
fn sample_bilinear(source: &RgbaImage, x: f64, y: f64, policy: VirtualPixel) -> Rgba<u8> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);

    let (x, y) = match policy {
        VirtualPixel::EdgeClamp => (x.clamp(0.0, max_x), y.clamp(0.0, max_y)),
        VirtualPixel::Transparent => {
            // more than half a pixel outside the raster has no source data
            if x < -0.5 || y < -0.5 || x > f64::from(width) - 0.5 || y > f64::from(height) - 0.5 {
                return Rgba([0, 0, 0, 0]);
            }
            (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
        }
    };

    let fx = x - x.floor();
    let fy = y - y.floor();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let p00 = source.get_pixel(x0, y0);
    let p10 = source.get_pixel(x1, y0);
    let p01 = source.get_pixel(x0, y1);
    let p11 = source.get_pixel(x1, y1);

    let mut blended = [0u8; 4];
    for c in 0..4 {
        let value = f64::from(p00.0[c]) * (1.0 - fx) * (1.0 - fy)
            + f64::from(p10.0[c]) * fx * (1.0 - fy)
            + f64::from(p01.0[c]) * (1.0 - fx) * fy
            + f64::from(p11.0[c]) * fx * fy;
        blended[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(blended)
}
