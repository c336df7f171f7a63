// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Curvature correction — a curved document region is described by four
// corners plus four draggable mid-side handles. Each side becomes a
// quadratic Bézier through its handle, and the enclosed region is flattened
// either into a fresh rectangle (global mode) or back into place inside the
// original photo (patch mode).

use faltwerk_core::cancel::CancelToken;
use faltwerk_core::error::FaltwerkError;
use faltwerk_core::geometry::Point;
use faltwerk_warp::{Viewport, VirtualPixel, Warper};
use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::MIN_OUTPUT_SIDE;
use crate::curves::{BoundaryCurves, control_through_handle, sample_quadratic_bezier};

/// Samples per Bézier side is `GRID_DIVISIONS + 1`.
const GRID_DIVISIONS: usize = 16;

/// Corrects page curl and lens bow described by corner-and-handle curves.
pub struct UnwarpCorrector<'w> {
    image: DynamicImage,
    warper: &'w dyn Warper,
    cancel: CancelToken,
}

impl<'w> UnwarpCorrector<'w> {
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

    /// Attach a cancellation token polled between pipeline phases.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Borrow the source image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Whole-image mode -----------------------------------------------------

    /// Flatten the curved region into a fresh upright rectangle.
    ///
    /// `corners` are in canonical order (top-left, top-right, bottom-right,
    /// bottom-left) and `handles` sit mid-side in top, right, bottom, left
    /// order; both are display coordinates. The output rectangle takes the
    /// larger of each pair of opposite side lengths, and samples without
    /// source data come out transparent.
    ///
    /// Returns `None` when the output would be degenerate, the warp fails,
    /// or the correction is cancelled.
    #[instrument(skip_all, fields(scale_factor))]
    pub fn correct_global(
        &self,
        corners: [Point; 4],
        handles: [Point; 4],
        scale_factor: f64,
    ) -> Option<DynamicImage> {
        let [tl, tr, br, bl] = corners.map(|p| p.scaled(scale_factor));
        let out_width = tl.distance_to(tr).max(bl.distance_to(br)).round() as u32;
        let out_height = tl.distance_to(bl).max(tr.distance_to(br)).round() as u32;
        if out_width < MIN_OUTPUT_SIDE || out_height < MIN_OUTPUT_SIDE {
            warn!(out_width, out_height, "Unwarp rejected: output would be degenerate");
            return None;
        }

        let curves = curved_boundary(corners, handles, scale_factor);
        if self.cancel.is_cancelled() {
            warn!("Unwarp cancelled");
            return None;
        }

        let cell_w = f64::from(out_width) / GRID_DIVISIONS as f64;
        let cell_h = f64::from(out_height) / GRID_DIVISIONS as f64;
        let pairs = curves.pairs_to_rect(Point::new(0.0, 0.0), cell_w, cell_h);
        if self.cancel.is_cancelled() {
            warn!("Unwarp cancelled");
            return None;
        }

        let viewport = Viewport::sized(out_width, out_height);
        match self
            .warper
            .warp_polynomial(&self.image, 3, &pairs, VirtualPixel::Transparent, viewport)
        {
            Ok(raster) => {
                info!(out_width, out_height, "Unwarp applied");
                Some(DynamicImage::ImageRgba8(raster))
            }
            Err(err) => {
                warn!(error = %err, "Unwarp failed");
                None
            }
        }
    }

    // -- Patch mode -----------------------------------------------------------

    /// Flatten the curved region in place, leaving the rest of the photo
    /// untouched.
    ///
    /// The region's bounding box (clamped to the image) becomes the warp
    /// viewport; destination coordinates stay in full-image space so the
    /// corrected patch can be composited straight back over the source.
    /// Transparent samples let the original pixels show through.
    ///
    /// Returns `None` when the clamped box is below the minimum size, the
    /// warp fails, or the correction is cancelled.
    #[instrument(skip_all, fields(scale_factor))]
    pub fn correct_patch(
        &self,
        corners: [Point; 4],
        handles: [Point; 4],
        scale_factor: f64,
    ) -> Option<DynamicImage> {
        let scaled = corners.map(|p| p.scaled(scale_factor));
        let bounds = corner_bbox(&scaled, self.image.width(), self.image.height());
        if bounds.width < MIN_OUTPUT_SIDE || bounds.height < MIN_OUTPUT_SIDE {
            warn!(
                width = bounds.width,
                height = bounds.height,
                "Patch unwarp rejected: region below minimum size"
            );
            return None;
        }

        let curves = curved_boundary(corners, handles, scale_factor);
        if self.cancel.is_cancelled() {
            warn!("Patch unwarp cancelled");
            return None;
        }

        let origin = Point::new(f64::from(bounds.x), f64::from(bounds.y));
        let cell_w = f64::from(bounds.width) / GRID_DIVISIONS as f64;
        let cell_h = f64::from(bounds.height) / GRID_DIVISIONS as f64;
        let pairs = curves.pairs_to_rect(origin, cell_w, cell_h);
        if self.cancel.is_cancelled() {
            warn!("Patch unwarp cancelled");
            return None;
        }

        let viewport = Viewport::offset(
            bounds.width,
            bounds.height,
            i64::from(bounds.x),
            i64::from(bounds.y),
        );
        let patch = match self
            .warper
            .warp_polynomial(&self.image, 3, &pairs, VirtualPixel::Transparent, viewport)
        {
            Ok(raster) => raster,
            Err(err) => {
                warn!(error = %err, "Patch unwarp failed");
                return None;
            }
        };

        let mut canvas = self.image.to_rgba8();
        image::imageops::overlay(&mut canvas, &patch, i64::from(bounds.x), i64::from(bounds.y));
        info!(
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            "Patch unwarp composited"
        );
        Some(DynamicImage::ImageRgba8(canvas))
    }
}

// -- Region geometry ----------------------------------------------------------

/// Build the four Bézier boundary curves from scaled corners and handles.
/// Both unwarp modes share this; they differ only in where the destination
/// lattice lands.
fn curved_boundary(corners: [Point; 4], handles: [Point; 4], scale_factor: f64) -> BoundaryCurves {
    let [tl, tr, br, bl] = corners.map(|p| p.scaled(scale_factor));
    let [top_h, right_h, bottom_h, left_h] = handles.map(|p| p.scaled(scale_factor));

    let top = sample_quadratic_bezier(tl, control_through_handle(tl, top_h, tr), tr, GRID_DIVISIONS);
    let bottom =
        sample_quadratic_bezier(bl, control_through_handle(bl, bottom_h, br), br, GRID_DIVISIONS);
    let left = sample_quadratic_bezier(tl, control_through_handle(tl, left_h, bl), bl, GRID_DIVISIONS);
    let right =
        sample_quadratic_bezier(tr, control_through_handle(tr, right_h, br), br, GRID_DIVISIONS);
    BoundaryCurves::new(top, bottom, left, right)
}

/// Axis-aligned bounding box of the corners, clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PatchBounds {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

fn corner_bbox(corners: &[Point; 4], image_width: u32, image_height: u32) -> PatchBounds {
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().clamp(0.0, f64::from(image_width));
    let y0 = min_y.floor().clamp(0.0, f64::from(image_height));
    let x1 = max_x.ceil().clamp(0.0, f64::from(image_width));
    let y1 = max_y.ceil().clamp(0.0, f64::from(image_height));

    PatchBounds {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0).max(0.0) as u32,
        height: (y1 - y0).max(0.0) as u32,
    }
}

// -- Tests --------------------------------------------------------------------
