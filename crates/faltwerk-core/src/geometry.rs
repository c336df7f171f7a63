// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometry types for the Faltwerk correction engine. All coordinates
// are in pixels with the origin at the top-left corner, y growing downward.

use serde::{Deserialize, Serialize};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Uniform scale, used to convert display coordinates to image pixels.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Per-axis scale.
    pub fn scaled_xy(self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }

    /// Linear interpolation toward `other`; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn midpoint(self, other: Point) -> Self {
        self.lerp(other, 0.5)
    }

    pub fn distance_to(self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// One control-point correspondence: where a pixel is in the source image
/// and where it should land in the corrected output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPointPair {
    pub source: Point,
    pub dest: Point,
}

impl ControlPointPair {
    pub fn new(source: Point, dest: Point) -> Self {
        Self { source, dest }
    }
}

/// A detected document boundary with corners in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
    /// Enclosed area in square pixels.
    pub area: f64,
    /// Ranking score in `[0, 1]`, blending relative area and rectangularity.
    pub confidence: f64,
}

impl Quadrilateral {
    /// Build a quadrilateral from corners in arbitrary order.
    ///
    /// Canonical roles are assigned geometrically: the corner with the
    /// smallest `x + y` is top-left, the largest is bottom-right, and the
    /// remaining two are split by `x - y` (smaller is bottom-left).
    pub fn from_unordered(corners: [Point; 4], area: f64, confidence: f64) -> Self {
        let mut by_sum = corners;
        by_sum.sort_by(|a, b| (a.x + a.y).total_cmp(&(b.x + b.y)));
        let top_left = by_sum[0];
        let bottom_right = by_sum[3];

        let mut rest = [by_sum[1], by_sum[2]];
        rest.sort_by(|a, b| (a.x - a.y).total_cmp(&(b.x - b.y)));
        let bottom_left = rest[0];
        let top_right = rest[1];

        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
            area,
            confidence,
        }
    }

    /// Corners in canonical order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Scale all corners and the area by per-axis factors.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            top_left: self.top_left.scaled_xy(sx, sy),
            top_right: self.top_right.scaled_xy(sx, sy),
            bottom_right: self.bottom_right.scaled_xy(sx, sy),
            bottom_left: self.bottom_left.scaled_xy(sx, sy),
            area: self.area * sx * sy,
            confidence: self.confidence,
        }
    }
}

/// Output of document-boundary detection: candidate quadrilaterals ranked by
/// confidence, plus the pixel dimensions they were detected at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Width of the analysed image in pixels.
    pub width: u32,
    /// Height of the analysed image in pixels.
    pub height: u32,
    /// Candidates sorted by descending confidence.
    pub quads: Vec<Quadrilateral>,
}

impl DetectionResult {
    /// Result carrying no candidates, used when the source image is unusable.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            quads: Vec::new(),
        }
    }

    /// Highest-confidence candidate, if any.
    pub fn best(&self) -> Option<&Quadrilateral> {
        self.quads.first()
    }

    /// Map all candidates into a display space of the given dimensions.
    ///
    /// Returns an empty result if the detection dimensions are zero, so a
    /// failed detection can be re-projected without special-casing.
    pub fn scaled_to(&self, display_width: u32, display_height: u32) -> Self {
        if self.width == 0 || self.height == 0 {
            return Self::empty();
        }
        let sx = f64::from(display_width) / f64::from(self.width);
        let sy = f64::from(display_height) / f64::from(self.height);
        Self {
            width: display_width,
            height: display_height,
            quads: self.quads.iter().map(|q| q.scaled(sx, sy)).collect(),
        }
    }
}
