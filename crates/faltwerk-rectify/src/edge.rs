// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wavy-edge correction — user-placed points along the document's wavy
// outline are classified onto the four image edges, turned into piecewise
// linear boundary curves, and the enclosed region is warped so every
// boundary point lands back on its straight edge.

use faltwerk_core::cancel::CancelToken;
use faltwerk_core::error::FaltwerkError;
use faltwerk_core::geometry::Point;
use faltwerk_warp::{Viewport, VirtualPixel, Warper};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::MIN_OUTPUT_SIDE;
use crate::curves::{BoundaryCurves, boundary_secondary};

/// Boundary samples per edge curve is `GRID_DIVISIONS + 1`.
const GRID_DIVISIONS: usize = 20;

/// One side of the rectified image boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RectEdge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Classify a point onto the nearest image edge and snap it there.
///
/// Distance to each edge is the perpendicular distance to its line; ties
/// resolve in declaration order (top, right, bottom, left). The snapped
/// point keeps its along-edge coordinate, so a point already on an edge
/// snaps to itself.
pub fn classify_point_to_edge(point: Point, width: f64, height: f64) -> (RectEdge, Point) {
    let d_top = point.y.abs();
    let d_right = (width - point.x).abs();
    let d_bottom = (height - point.y).abs();
    let d_left = point.x.abs();

    if d_top <= d_right && d_top <= d_bottom && d_top <= d_left {
        (RectEdge::Top, Point::new(point.x, 0.0))
    } else if d_right <= d_bottom && d_right <= d_left {
        (RectEdge::Right, Point::new(width, point.y))
    } else if d_bottom <= d_left {
        (RectEdge::Bottom, Point::new(point.x, height))
    } else {
        (RectEdge::Left, Point::new(0.0, point.y))
    }
}

/// Corrects a document whose edges photograph wavy instead of straight.
pub struct EdgeCorrector<'w> {
    image: DynamicImage,
    warper: &'w dyn Warper,
    cancel: CancelToken,
}

impl<'w> EdgeCorrector<'w> {
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

    // -- Correction -----------------------------------------------------------

    /// Straighten the wavy boundary described by the given points.
    ///
    /// Points are display coordinates and are scaled into image pixels first.
    /// Each one is assigned to its nearest edge; per edge the points become a
    /// piecewise linear curve anchored at the image corners, and the interior
    /// is rebuilt by transfinite interpolation before an order-3 polynomial
    /// warp pulls every curve back onto its straight edge.
    ///
    /// Returns `None` when no points are given, the image is smaller than
    /// the minimum output, the warp fails, or the correction is cancelled.
    #[instrument(skip_all, fields(points = points.len(), scale_factor))]
    pub fn correct(&self, points: &[Point], scale_factor: f64) -> Option<DynamicImage> {
        if points.is_empty() {
            warn!("Edge correction rejected: no boundary points");
            return None;
        }
        let (width, height) = (self.image.width(), self.image.height());
        if width < MIN_OUTPUT_SIDE || height < MIN_OUTPUT_SIDE {
            warn!(width, height, "Edge correction rejected: image below minimum size");
            return None;
        }

        let curves = boundary_curves(points, scale_factor, f64::from(width), f64::from(height));
        if self.cancel.is_cancelled() {
            warn!("Edge correction cancelled");
            return None;
        }

        let cell_w = f64::from(width) / GRID_DIVISIONS as f64;
        let cell_h = f64::from(height) / GRID_DIVISIONS as f64;
        let pairs = curves.pairs_to_rect(Point::new(0.0, 0.0), cell_w, cell_h);
        if self.cancel.is_cancelled() {
            warn!("Edge correction cancelled");
            return None;
        }

        let viewport = Viewport::sized(width, height);
        match self
            .warper
            .warp_polynomial(&self.image, 3, &pairs, VirtualPixel::EdgeClamp, viewport)
        {
            Ok(raster) => {
                info!(points = points.len(), "Edge correction applied");
                Some(DynamicImage::ImageRgba8(raster))
            }
            Err(err) => {
                warn!(error = %err, "Edge correction failed");
                None
            }
        }
    }
}

// -- Boundary curve construction ----------------------------------------------

/// Build the four boundary curves from classified user points.
///
/// Each curve is sampled at `GRID_DIVISIONS + 1` evenly spaced positions
/// along its axis, interpolating linearly between the image corner, the
/// sorted user points assigned to that edge, and the opposite corner.
fn boundary_curves(points: &[Point], scale_factor: f64, width: f64, height: f64) -> BoundaryCurves {
    let mut top = vec![Point::new(0.0, 0.0)];
    let mut bottom = vec![Point::new(0.0, height)];
    let mut left = vec![Point::new(0.0, 0.0)];
    let mut right = vec![Point::new(width, 0.0)];

    for point in points {
        let scaled = point.scaled(scale_factor);
        match classify_point_to_edge(scaled, width, height).0 {
            RectEdge::Top => top.push(scaled),
            RectEdge::Right => right.push(scaled),
            RectEdge::Bottom => bottom.push(scaled),
            RectEdge::Left => left.push(scaled),
        }
    }
    debug!(
        top = top.len() - 1,
        right = right.len() - 1,
        bottom = bottom.len() - 1,
        left = left.len() - 1,
        "Boundary points classified"
    );

    top.push(Point::new(width, 0.0));
    bottom.push(Point::new(width, height));
    left.push(Point::new(0.0, height));
    right.push(Point::new(width, height));

    sort_between_corners(&mut top, true);
    sort_between_corners(&mut bottom, true);
    sort_between_corners(&mut left, false);
    sort_between_corners(&mut right, false);

    let sample_h = |anchors: &[Point]| {
        (0..=GRID_DIVISIONS)
            .map(|col| {
                let x = col as f64 * width / GRID_DIVISIONS as f64;
                Point::new(x, boundary_secondary(anchors, x, true))
            })
            .collect::<Vec<_>>()
    };
    let sample_v = |anchors: &[Point]| {
        (0..=GRID_DIVISIONS)
            .map(|row| {
                let y = row as f64 * height / GRID_DIVISIONS as f64;
                Point::new(boundary_secondary(anchors, y, false), y)
            })
            .collect::<Vec<_>>()
    };

    BoundaryCurves::new(
        sample_h(&top),
        sample_h(&bottom),
        sample_v(&left),
        sample_v(&right),
    )
}

/// Sort a curve's interior anchors by their along-edge coordinate while the
/// first and last entries (the image corners) stay put.
fn sort_between_corners(anchors: &mut [Point], horizontal: bool) {
    let len = anchors.len();
    if len > 3 {
        anchors[1..len - 1].sort_by(|a, b| {
            if horizontal {
                a.x.total_cmp(&b.x)
            } else {
                a.y.total_cmp(&b.y)
            }
        });
    }
}

// -- Tests --------------------------------------------------------------------
