// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tri-fold flattening — a letter folded in thirds photographed slightly
// open shows three planar panels separated by two fold lines. Eight marked
// points (four outer corners plus both ends of each fold) split the page
// into three quadrilaterals, each is perspective-rectified on its own, and
// the results are stitched into one flat page.

use faltwerk_core::cancel::CancelToken;
use faltwerk_core::error::FaltwerkError;
use faltwerk_core::geometry::{ControlPointPair, Point};
use faltwerk_warp::{Viewport, VirtualPixel, Warper};
use image::{DynamicImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// A fold line shorter than this is widened to keep every panel warpable.
const MIN_PANEL_HEIGHT: f64 = 10.0;

/// The eight user-marked points of a tri-folded page, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriFoldPoints {
    pub top_left: Point,
    pub top_right: Point,
    pub upper_fold_left: Point,
    pub upper_fold_right: Point,
    pub lower_fold_left: Point,
    pub lower_fold_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl TriFoldPoints {
    /// All eight points scaled by `factor`, display to pixel space.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            top_left: self.top_left.scaled(factor),
            top_right: self.top_right.scaled(factor),
            upper_fold_left: self.upper_fold_left.scaled(factor),
            upper_fold_right: self.upper_fold_right.scaled(factor),
            lower_fold_left: self.lower_fold_left.scaled(factor),
            lower_fold_right: self.lower_fold_right.scaled(factor),
            bottom_left: self.bottom_left.scaled(factor),
            bottom_right: self.bottom_right.scaled(factor),
        }
    }
}

/// Flattens a page folded in thirds into a single upright rectangle.
pub struct TriFoldCorrector<'w> {
    image: DynamicImage,
    warper: &'w dyn Warper,
    cancel: CancelToken,
}

impl<'w> TriFoldCorrector<'w> {
    // -- Construction ---------------------------------------------------------

    /// Create a corrector from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<std::path::Path>,
        warper: &'w dyn Warper,
    ) -> Result<Self, FaltwerkError> {
        let image = image::open(path.as_ref()).map_err(|err| {
            FaltwerkError::Image(format!(
                "failed to open image {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        Ok(Self::from_dynamic(image, warper))
    }

    /// Create a corrector wrapping an existing `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage, warper: &'w dyn Warper) -> Self {
        Self {
            image,
            warper,
            cancel: CancelToken::new(),
        }
    }

    /// Attach a cancellation token polled before each panel warp.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Borrow the source image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Correction -----------------------------------------------------------

    /// Rectify and stitch the three panels described by `points`.
    ///
    /// The page width is the longest of the four horizontal edges, so no
    /// panel gets downsampled to fit a shorter one. Panel heights come from
    /// the vertical gaps between row midlines, floored at a minimum so a
    /// mis-dragged fold cannot collapse a panel. The stitched output keeps
    /// the source image's pixel format.
    ///
    /// Returns `None` when the page width degenerates to zero, any panel
    /// warp fails, or the correction is cancelled.
    #[instrument(skip_all, fields(scale_factor))]
    pub fn correct(&self, points: &TriFoldPoints, scale_factor: f64) -> Option<DynamicImage> {
        let p = points.scaled(scale_factor);

        let page_width = p
            .top_left
            .distance_to(p.top_right)
            .max(p.upper_fold_left.distance_to(p.upper_fold_right))
            .max(p.lower_fold_left.distance_to(p.lower_fold_right))
            .max(p.bottom_left.distance_to(p.bottom_right))
            .round() as u32;
        if page_width == 0 {
            warn!("Tri-fold rejected: all horizontal edges have zero length");
            return None;
        }

        let row_y = [
            (p.top_left.y + p.top_right.y) / 2.0,
            (p.upper_fold_left.y + p.upper_fold_right.y) / 2.0,
            (p.lower_fold_left.y + p.lower_fold_right.y) / 2.0,
            (p.bottom_left.y + p.bottom_right.y) / 2.0,
        ];
        let panel_heights = [
            ((row_y[1] - row_y[0]).abs().max(MIN_PANEL_HEIGHT)).round() as u32,
            ((row_y[2] - row_y[1]).abs().max(MIN_PANEL_HEIGHT)).round() as u32,
            ((row_y[3] - row_y[2]).abs().max(MIN_PANEL_HEIGHT)).round() as u32,
        ];

        // each panel quad in top-left, top-right, bottom-right, bottom-left order
        let panels = [
            [p.top_left, p.top_right, p.upper_fold_right, p.upper_fold_left],
            [p.upper_fold_left, p.upper_fold_right, p.lower_fold_right, p.lower_fold_left],
            [p.lower_fold_left, p.lower_fold_right, p.bottom_right, p.bottom_left],
        ];

        let total_height: u32 = panel_heights.iter().sum();
        let mut canvas = RgbaImage::new(page_width, total_height);
        let mut y_cursor: u32 = 0;

        for (index, (quad, height)) in panels.iter().zip(panel_heights).enumerate() {
            if self.cancel.is_cancelled() {
                warn!(panel = index, "Tri-fold cancelled");
                return None;
            }
            let pairs = perspective_pairs(quad, f64::from(page_width), f64::from(height));
            let raster = match self.warper.warp_perspective(
                &self.image,
                &pairs,
                VirtualPixel::EdgeClamp,
                Viewport::sized(page_width, height),
            ) {
                Ok(raster) => raster,
                Err(err) => {
                    warn!(panel = index, error = %err, "Tri-fold panel warp failed");
                    return None;
                }
            };
            debug!(panel = index, height, y = y_cursor, "Panel rectified");
            imageops::replace(&mut canvas, &raster, 0, i64::from(y_cursor));
            y_cursor += height;
        }

        info!(page_width, total_height, "Tri-fold flattened");
        Some(match_source_color(&self.image, canvas))
    }
}

// -- Panel geometry -----------------------------------------------------------

/// Corner pairs mapping one panel quad onto an exact upright rectangle.
fn perspective_pairs(quad: &[Point; 4], width: f64, height: f64) -> Vec<ControlPointPair> {
    let [tl, tr, br, bl] = *quad;
    vec![
        ControlPointPair {
            source: tl,
            dest: Point::new(0.0, 0.0),
        },
        ControlPointPair {
            source: tr,
            dest: Point::new(width, 0.0),
        },
        ControlPointPair {
            source: br,
            dest: Point::new(width, height),
        },
        ControlPointPair {
            source: bl,
            dest: Point::new(0.0, height),
        },
    ]
}

/// Convert the stitched RGBA canvas back to the source image's pixel format.
fn match_source_color(source: &DynamicImage, canvas: RgbaImage) -> DynamicImage {
    let stitched = DynamicImage::ImageRgba8(canvas);
    match source {
        DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(stitched.to_luma8()),
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLumaA8(stitched.to_luma_alpha8()),
        DynamicImage::ImageRgb8(_) => DynamicImage::ImageRgb8(stitched.to_rgb8()),
        _ => stitched,
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingWarper, WarpKind, banded_rgb, blank_gray};
    use faltwerk_warp::SoftwareWarper;

    /// Points for an already-flat page spanning the full image, folds at
    /// exact thirds.
    fn flat_thirds(width: f64, height: f64) -> TriFoldPoints {
        let third = height / 3.0;
        TriFoldPoints {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(width, 0.0),
            upper_fold_left: Point::new(0.0, third),
            upper_fold_right: Point::new(width, third),
            lower_fold_left: Point::new(0.0, 2.0 * third),
            lower_fold_right: Point::new(width, 2.0 * third),
            bottom_left: Point::new(0.0, height),
            bottom_right: Point::new(width, height),
        }
    }

    #[test]
    fn flat_page_at_thirds_reproduces_each_band() {
        let bands = [[200u8, 30, 30], [30, 200, 30], [30, 30, 200]];
        let image = banded_rgb(300, 600, &bands);
        let corrector = TriFoldCorrector::from_dynamic(image, &SoftwareWarper);

        let out = corrector
            .correct(&flat_thirds(300.0, 600.0), 1.0)
            .expect("flat page should rectify");
        assert_eq!(out.width(), 300);
        assert_eq!(out.height(), 600);

        let rgb = out.to_rgb8();
        assert_eq!(rgb.get_pixel(150, 100).0, bands[0]);
        assert_eq!(rgb.get_pixel(150, 300).0, bands[1]);
        assert_eq!(rgb.get_pixel(150, 500).0, bands[2]);
    }

    #[test]
    fn panel_warps_use_the_widest_edge_and_floored_heights() {
        let warper = RecordingWarper::new();
        let corrector = TriFoldCorrector::from_dynamic(blank_gray(200, 200, 128), &warper);
        let points = TriFoldPoints {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(100.0, 0.0),
            upper_fold_left: Point::new(0.0, 4.0),
            upper_fold_right: Point::new(100.0, 4.0),
            lower_fold_left: Point::new(0.0, 30.0),
            lower_fold_right: Point::new(100.0, 30.0),
            bottom_left: Point::new(0.0, 60.0),
            bottom_right: Point::new(100.0, 60.0),
        };

        let out = corrector.correct(&points, 1.0).expect("should rectify");
        // first panel is only 4 tall and gets floored to the minimum
        assert_eq!(out.height(), 10 + 26 + 30);

        let calls = warper.calls();
        assert_eq!(calls.len(), 3);
        for call in &calls {
            assert_eq!(call.kind, WarpKind::Perspective);
            assert_eq!(call.policy, VirtualPixel::EdgeClamp);
            assert_eq!(call.pairs.len(), 4);
        }
        assert_eq!(calls[0].viewport, Viewport::sized(100, 10));
        assert_eq!(calls[1].viewport, Viewport::sized(100, 26));
        assert_eq!(calls[2].viewport, Viewport::sized(100, 30));
        // the first panel's quad maps onto its exact output rectangle
        assert_eq!(calls[0].pairs[2].dest, Point::new(100.0, 10.0));
    }

    #[test]
    fn scale_factor_converts_display_points_to_pixels() {
        let warper = RecordingWarper::new();
        let corrector = TriFoldCorrector::from_dynamic(blank_gray(400, 400, 128), &warper);
        let points = flat_thirds(100.0, 150.0);

        corrector.correct(&points, 2.0).expect("should rectify");
        let calls = warper.calls();
        assert_eq!(calls[0].viewport, Viewport::sized(200, 100));
        assert_eq!(calls[0].pairs[1].source, Point::new(200.0, 0.0));
    }

    #[test]
    fn grayscale_source_keeps_grayscale_output() {
        let corrector = TriFoldCorrector::from_dynamic(blank_gray(120, 240, 90), &SoftwareWarper);
        let out = corrector
            .correct(&flat_thirds(120.0, 240.0), 1.0)
            .expect("should rectify");
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
        assert_eq!(out.to_luma8().get_pixel(60, 120).0, [90]);
    }

    #[test]
    fn zero_width_page_is_rejected() {
        let warper = RecordingWarper::new();
        let corrector = TriFoldCorrector::from_dynamic(blank_gray(100, 100, 128), &warper);
        let mut points = flat_thirds(50.0, 90.0);
        points.top_right = points.top_left;
        points.upper_fold_right = points.upper_fold_left;
        points.lower_fold_right = points.lower_fold_left;
        points.bottom_right = points.bottom_left;

        assert!(corrector.correct(&points, 1.0).is_none());
        assert!(warper.calls().is_empty());
    }

    #[test]
    fn cancelled_token_aborts_before_any_panel() {
        let warper = RecordingWarper::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let corrector =
            TriFoldCorrector::from_dynamic(blank_gray(100, 100, 128), &warper).with_cancel(cancel);

        assert!(corrector.correct(&flat_thirds(80.0, 90.0), 1.0).is_none());
        assert!(warper.calls().is_empty());
    }
}
