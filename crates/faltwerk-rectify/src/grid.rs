// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Control-grid straightening — the user drags the points of a regular grid
// onto distorted document features, and the image is warped so every dragged
// point returns to its regular position.

use faltwerk_core::cancel::CancelToken;
use faltwerk_core::error::FaltwerkError;
use faltwerk_core::geometry::{ControlPointPair, Point};
use faltwerk_warp::{Viewport, VirtualPixel, Warper};
use image::DynamicImage;
use tracing::{info, instrument, warn};

/// Generate the evenly spaced reference grid for an image, row-major.
///
/// Corner points land exactly on the image corners; interior points divide
/// each axis uniformly.
pub fn generate_regular_grid(width: f64, height: f64, rows: u32, cols: u32) -> Vec<Point> {
    let col_div = cols.saturating_sub(1).max(1);
    let row_div = rows.saturating_sub(1).max(1);
    let mut points = Vec::with_capacity((rows * cols) as usize);
    for r in 0..rows {
        for c in 0..cols {
            points.push(Point::new(
                f64::from(c) * width / f64::from(col_div),
                f64::from(r) * height / f64::from(row_div),
            ));
        }
    }
    points
}

/// Polynomial order for an R x C grid: `min(3, min(rows, cols))`.
///
/// Small grids get low orders so the fit cannot oscillate between the few
/// constraints it has.
pub fn polynomial_order(rows: u32, cols: u32) -> u32 {
    rows.min(cols).min(3)
}

/// Build warp pairs from a dragged grid: sources are the dragged positions,
/// destinations the regular ones, both scaled from display to image pixels.
///
/// Returns `None` (with a warning) when either point list disagrees with the
/// grid dimensions.
pub fn build_grid_pairs(
    rows: u32,
    cols: u32,
    expected: &[Point],
    dragged: &[Point],
    scale_factor: f64,
) -> Option<Vec<ControlPointPair>> {
    let wanted = (rows * cols) as usize;
    if wanted == 0 || expected.len() != wanted || dragged.len() != wanted {
        warn!(
            rows,
            cols,
            expected = expected.len(),
            dragged = dragged.len(),
            "Control grid rejected: point counts do not match grid dimensions"
        );
        return None;
    }
    Some(
        dragged
            .iter()
            .zip(expected)
            .map(|(d, e)| ControlPointPair::new(d.scaled(scale_factor), e.scaled(scale_factor)))
            .collect(),
    )
}

/// Straightens an image from a dragged control grid.
pub struct GridStraightener<'w> {
    image: DynamicImage,
    warper: &'w dyn Warper,
    cancel: CancelToken,
}

impl std::fmt::Debug for GridStraightener<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStraightener")
            .field("image", &self.image)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl<'w> GridStraightener<'w> {
    // -- Construction ---------------------------------------------------------

    /// Create a straightener from a file path.
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

    /// Create a straightener wrapping an existing `DynamicImage`.
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

    /// Warp the image so each dragged grid point returns to its regular
    /// position. The output keeps the source dimensions; samples pulled from
    /// outside the image repeat the nearest edge pixel.
    ///
    /// Returns `None` when the inputs are inconsistent, the warp fails, or
    /// the correction is cancelled.
    #[instrument(skip_all, fields(rows, cols, scale_factor))]
    pub fn correct(
        &self,
        rows: u32,
        cols: u32,
        expected: &[Point],
        dragged: &[Point],
        scale_factor: f64,
    ) -> Option<DynamicImage> {
        let pairs = build_grid_pairs(rows, cols, expected, dragged, scale_factor)?;
        if self.cancel.is_cancelled() {
            warn!("Grid correction cancelled");
            return None;
        }

        let order = polynomial_order(rows, cols);
        let viewport = Viewport::sized(self.image.width(), self.image.height());
        match self
            .warper
            .warp_polynomial(&self.image, order, &pairs, VirtualPixel::EdgeClamp, viewport)
        {
            Ok(raster) => {
                info!(
                    order,
                    points = pairs.len(),
                    "Grid straightening applied"
                );
                Some(DynamicImage::ImageRgba8(raster))
            }
            Err(err) => {
                warn!(error = %err, "Grid straightening failed");
                None
            }
        }
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingWarper, WarpKind, gradient_rgba};
    use faltwerk_warp::SoftwareWarper;

    #[test]
    fn regular_grid_is_row_major_with_exact_corners() {
        let grid = generate_regular_grid(300.0, 600.0, 3, 4);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0], Point::new(0.0, 0.0));
        assert_eq!(grid[3], Point::new(300.0, 0.0));
        assert_eq!(grid[4], Point::new(0.0, 300.0));
        assert_eq!(grid[11], Point::new(300.0, 600.0));
        assert!((grid[1].x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_row_grid_spans_the_width_only() {
        let grid = generate_regular_grid(100.0, 50.0, 1, 3);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[2], Point::new(100.0, 0.0));
        assert!(grid.iter().all(|p| p.y == 0.0));
    }

    #[test]
    fn polynomial_order_tracks_the_smaller_grid_axis() {
        assert_eq!(polynomial_order(3, 3), 3);
        assert_eq!(polynomial_order(2, 5), 2);
        assert_eq!(polynomial_order(8, 8), 3);
        assert_eq!(polynomial_order(1, 4), 1);
    }

    #[test]
    fn pairs_map_dragged_sources_to_expected_destinations() {
        let expected = generate_regular_grid(100.0, 100.0, 2, 2);
        let mut dragged = expected.clone();
        dragged[3] = Point::new(92.0, 95.0);

        let pairs = build_grid_pairs(2, 2, &expected, &dragged, 2.0).unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3].source, Point::new(184.0, 190.0));
        assert_eq!(pairs[3].dest, Point::new(200.0, 200.0));
    }

    #[test]
    fn mismatched_point_counts_are_rejected() {
        let expected = generate_regular_grid(100.0, 100.0, 3, 3);
        let dragged = generate_regular_grid(100.0, 100.0, 2, 3);
        assert!(build_grid_pairs(3, 3, &expected, &dragged, 1.0).is_none());
        assert!(build_grid_pairs(3, 3, &dragged, &expected, 1.0).is_none());
        assert!(build_grid_pairs(0, 3, &[], &[], 1.0).is_none());
    }

    #[test]
    fn correct_feeds_the_expected_warp_parameters() {
        let warper = RecordingWarper::new();
        let expected = generate_regular_grid(120.0, 90.0, 3, 3);
        let straightener = GridStraightener::from_dynamic(gradient_rgba(120, 90), &warper);

        let out = straightener
            .correct(3, 3, &expected, &expected, 1.0)
            .expect("correction should succeed");
        assert_eq!(out.width(), 120);
        assert_eq!(out.height(), 90);

        let calls = warper.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, WarpKind::Polynomial);
        assert_eq!(calls[0].order, Some(3));
        assert_eq!(calls[0].policy, VirtualPixel::EdgeClamp);
        assert_eq!(calls[0].viewport, Viewport::sized(120, 90));
        assert_eq!(calls[0].pairs.len(), 9);
        assert_eq!(calls[0].pairs[8].dest, expected[8]);
        // nothing was dragged, so every pair is an identity correspondence
        for pair in &calls[0].pairs {
            assert_eq!(pair.source, pair.dest);
        }
    }

    #[test]
    fn identity_grid_reproduces_the_image() {
        let warper = SoftwareWarper;
        let image = gradient_rgba(60, 60);
        let reference = image.to_rgba8();
        let expected = generate_regular_grid(59.0, 59.0, 4, 4);
        let straightener = GridStraightener::from_dynamic(image, &warper);

        let out = straightener
            .correct(4, 4, &expected, &expected, 1.0)
            .expect("identity grid should warp cleanly")
            .to_rgba8();
        for &(x, y) in &[(0u32, 0u32), (30, 30), (59, 59)] {
            assert_eq!(out.get_pixel(x, y), reference.get_pixel(x, y));
        }
    }

    #[test]
    fn cancelled_token_aborts_before_the_warp() {
        let warper = RecordingWarper::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let expected = generate_regular_grid(50.0, 50.0, 2, 2);
        let straightener =
            GridStraightener::from_dynamic(gradient_rgba(50, 50), &warper).with_cancel(cancel);

        assert!(straightener.correct(2, 2, &expected, &expected, 1.0).is_none());
        assert!(warper.calls().is_empty());
    }

    #[test]
    fn open_missing_file_is_an_image_error() {
        let warper = SoftwareWarper;
        let err = GridStraightener::open("/nonexistent/grid.png", &warper).unwrap_err();
        assert!(matches!(err, FaltwerkError::Image(_)));
    }
}
