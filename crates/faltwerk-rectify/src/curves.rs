// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary-curve machinery shared by the edge and unwarp correctors: quadratic
// Bézier sampling, piecewise-linear boundary interpolation, and transfinite
// interpolation of interior grid points from four sampled boundary curves.

use faltwerk_core::geometry::{ControlPointPair, Point};

/// Derive the quadratic Bézier control point that makes the curve pass
/// through `handle` at t = 0.5.
///
/// Solving `B(0.5) = handle` for the middle control point gives
/// `2 * handle - 0.5 * p0 - 0.5 * p2`. With the handle on the straight line
/// between the endpoints this degenerates to a straight segment.
pub fn control_through_handle(p0: Point, handle: Point, p2: Point) -> Point {
    Point::new(
        2.0 * handle.x - 0.5 * p0.x - 0.5 * p2.x,
        2.0 * handle.y - 0.5 * p0.y - 0.5 * p2.y,
    )
}

/// Sample a quadratic Bézier curve at `segments + 1` evenly spaced parameter
/// values, endpoints included.
pub fn sample_quadratic_bezier(p0: Point, control: Point, p2: Point, segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            bezier_point(p0, control, p2, t)
        })
        .collect()
}

fn bezier_point(p0: Point, control: Point, p2: Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * control.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * control.y + t * t * p2.y,
    )
}

/// Interpolate the off-axis coordinate of a piecewise-linear boundary.
///
/// `anchors` must be non-empty and sorted by the primary axis (x when
/// `horizontal`, y otherwise). Positions outside the anchored range clamp to
/// the nearest endpoint's secondary coordinate.
pub fn boundary_secondary(anchors: &[Point], primary: f64, horizontal: bool) -> f64 {
    let primary_of = |p: &Point| if horizontal { p.x } else { p.y };
    let secondary_of = |p: &Point| if horizontal { p.y } else { p.x };

    let first = &anchors[0];
    let last = &anchors[anchors.len() - 1];
    if primary <= primary_of(first) {
        return secondary_of(first);
    }
    if primary >= primary_of(last) {
        return secondary_of(last);
    }

    for window in anchors.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        if primary <= primary_of(b) {
            let span = primary_of(b) - primary_of(a);
            if span.abs() < 1e-9 {
                // coincident anchors, take the earlier one
                return secondary_of(a);
            }
            let t = (primary - primary_of(a)) / span;
            return secondary_of(a) + (secondary_of(b) - secondary_of(a)) * t;
        }
    }
    secondary_of(last)
}

/// Four sampled boundary curves of a quadrilateral image region.
///
/// `top` and `bottom` run left to right, `left` and `right` top to bottom,
/// and the curves share their corner samples (`top[0] == left[0]` and so on).
/// Opposing curves carry the same number of samples, so the curves define a
/// full interior lattice via transfinite interpolation.
#[derive(Debug, Clone)]
pub struct BoundaryCurves {
    top: Vec<Point>,
    bottom: Vec<Point>,
    left: Vec<Point>,
    right: Vec<Point>,
}

impl BoundaryCurves {
    pub fn new(top: Vec<Point>, bottom: Vec<Point>, left: Vec<Point>, right: Vec<Point>) -> Self {
        debug_assert_eq!(top.len(), bottom.len());
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(top.len() >= 2 && left.len() >= 2);
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Samples per horizontal curve.
    pub fn columns(&self) -> usize {
        self.top.len()
    }

    /// Samples per vertical curve.
    pub fn rows(&self) -> usize {
        self.left.len()
    }

    /// Interior lattice point at `(row, col)` by transfinite interpolation:
    /// the two directional blends minus the bilinear corner blend they both
    /// contain.
    pub fn source_point(&self, row: usize, col: usize) -> Point {
        let u = col as f64 / (self.columns() - 1) as f64;
        let v = row as f64 / (self.rows() - 1) as f64;

        let across = self.top[col].lerp(self.bottom[col], v);
        let down = self.left[row].lerp(self.right[row], u);

        let tl = self.top[0];
        let tr = self.top[self.columns() - 1];
        let bl = self.bottom[0];
        let br = self.bottom[self.columns() - 1];
        let corner_x = tl.x * (1.0 - u) * (1.0 - v)
            + tr.x * u * (1.0 - v)
            + bl.x * (1.0 - u) * v
            + br.x * u * v;
        let corner_y = tl.y * (1.0 - u) * (1.0 - v)
            + tr.y * u * (1.0 - v)
            + bl.y * (1.0 - u) * v
            + br.y * u * v;

        Point::new(across.x + down.x - corner_x, across.y + down.y - corner_y)
    }

    /// Emit control-point pairs mapping this region onto a regular grid.
    ///
    /// The destination lattice starts at `origin` and steps by `cell_width`
    /// and `cell_height`; sources come from `source_point`. Pairs are emitted
    /// row-major, `rows() * columns()` in total.
    pub fn pairs_to_rect(&self, origin: Point, cell_width: f64, cell_height: f64) -> Vec<ControlPointPair> {
        let mut pairs = Vec::with_capacity(self.rows() * self.columns());
        for row in 0..self.rows() {
            for col in 0..self.columns() {
                let source = self.source_point(row, col);
                let dest = Point::new(
                    origin.x + col as f64 * cell_width,
                    origin.y + row as f64 * cell_height,
                );
                pairs.push(ControlPointPair::new(source, dest));
            }
        }
        pairs
    }
}
