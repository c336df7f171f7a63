// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 3x3 perspective transform fitted to exactly four control-point pairs via
// the direct linear transform, normalised so the bottom-right entry is 1.

use faltwerk_core::error::{FaltwerkError, Result};
use faltwerk_core::geometry::ControlPointPair;
use nalgebra::{DMatrix, DVector};

/// A projective mapping from destination to source coordinates.
#[derive(Debug, Clone)]
pub struct Homography {
    /// Row-major 3x3 matrix with `m[8] == 1`.
    m: [f64; 9],
}

impl Homography {
    /// Fit the homography carrying each pair's destination onto its source.
    ///
    /// Exactly four pairs are required; the eight unknown matrix entries are
    /// solved from the eight resulting linear equations. Degenerate
    /// configurations (repeated or collinear corners) fail with a warp error.
    pub fn from_pairs(pairs: &[ControlPointPair]) -> Result<Self> {
        if pairs.len() != 4 {
            return Err(FaltwerkError::ControlPoints(format!(
                "perspective warp needs exactly 4 control points, got {}",
                pairs.len()
            )));
        }

        let mut a = DMatrix::<f64>::zeros(8, 8);
        let mut b = DVector::<f64>::zeros(8);
        for (i, pair) in pairs.iter().enumerate() {
            let (x, y) = (pair.dest.x, pair.dest.y);
            let (xp, yp) = (pair.source.x, pair.source.y);
            let r1 = i * 2;
            let r2 = i * 2 + 1;

            a[(r1, 0)] = x;
            a[(r1, 1)] = y;
            a[(r1, 2)] = 1.0;
            a[(r1, 6)] = -xp * x;
            a[(r1, 7)] = -xp * y;
            b[r1] = xp;

            a[(r2, 3)] = x;
            a[(r2, 4)] = y;
            a[(r2, 5)] = 1.0;
            a[(r2, 6)] = -yp * x;
            a[(r2, 7)] = -yp * y;
            b[r2] = yp;
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or_else(|| FaltwerkError::Warp("degenerate perspective control points".into()))?;

        Ok(Self {
            m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
        })
    }

    /// Map a destination coordinate to its source coordinate.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        let w = m[6] * x + m[7] * y + m[8];
        if w.abs() < 1e-10 {
            // point at infinity, fall through unchanged
            return (x, y);
        }
        (
            (m[0] * x + m[1] * y + m[2]) / w,
            (m[3] * x + m[4] * y + m[5]) / w,
        )
    }
}
