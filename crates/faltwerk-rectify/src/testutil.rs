// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test-only helpers shared across the correction pipelines: a recording warp
// backend and synthetic image builders.

use std::sync::Mutex;

use faltwerk_core::error::Result;
use faltwerk_core::geometry::ControlPointPair;
use faltwerk_warp::{Viewport, VirtualPixel, Warper};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpKind {
    Polynomial,
    Perspective,
}

/// One recorded warp invocation.
#[derive(Debug, Clone)]
pub struct WarpCall {
    pub kind: WarpKind,
    pub order: Option<u32>,
    pub pairs: Vec<ControlPointPair>,
    pub policy: VirtualPixel,
    pub viewport: Viewport,
}

/// Warp backend that records every call and returns a blank raster of the
/// requested viewport size. Lets corrector tests assert on the exact warp
/// parameters without resampling anything.
#[derive(Debug, Default)]
pub struct RecordingWarper {
    calls: Mutex<Vec<WarpCall>>,
}

impl RecordingWarper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<WarpCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Warper for RecordingWarper {
    fn warp_polynomial(
        &self,
        _image: &DynamicImage,
        order: u32,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage> {
        self.calls.lock().unwrap().push(WarpCall {
            kind: WarpKind::Polynomial,
            order: Some(order),
            pairs: pairs.to_vec(),
            policy,
            viewport,
        });
        Ok(RgbaImage::new(viewport.width, viewport.height))
    }

    fn warp_perspective(
        &self,
        _image: &DynamicImage,
        pairs: &[ControlPointPair],
        policy: VirtualPixel,
        viewport: Viewport,
    ) -> Result<RgbaImage> {
        self.calls.lock().unwrap().push(WarpCall {
            kind: WarpKind::Perspective,
            order: None,
            pairs: pairs.to_vec(),
            policy,
            viewport,
        });
        Ok(RgbaImage::new(viewport.width, viewport.height))
    }
}

/// RGBA image whose pixel values encode their own coordinates.
pub fn gradient_rgba(width: u32, height: u32) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 120, 255])
    });
    DynamicImage::ImageRgba8(img)
}

/// Uniform grayscale image.
pub fn blank_gray(width: u32, height: u32, level: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([level])))
}

/// Dark grayscale image with a bright axis-aligned rectangle, the synthetic
/// shape used throughout the detection tests.
pub fn white_rect_on_dark(
    width: u32,
    height: u32,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
) -> DynamicImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([30u8]));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Luma([240u8]));
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// RGB image of horizontal colour bands of equal height, top to bottom.
pub fn banded_rgb(width: u32, height: u32, bands: &[[u8; 3]]) -> DynamicImage {
    let band_height = (height as usize / bands.len()).max(1) as u32;
    let img = image::RgbImage::from_fn(width, height, |_x, y| {
        let idx = ((y / band_height) as usize).min(bands.len() - 1);
        image::Rgb(bands[idx])
    });
    DynamicImage::ImageRgb8(img)
}
