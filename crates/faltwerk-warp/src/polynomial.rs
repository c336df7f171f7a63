// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bivariate polynomial coordinate mapping, fitted to control points by
// least squares. Used for grid, edge, and curvature corrections where a
// perspective transform cannot follow locally bent geometry.

use faltwerk_core::error::{FaltwerkError, Result};
use faltwerk_core::geometry::ControlPointPair;
use nalgebra::{DMatrix, DVector};

/// Singular values below this are treated as zero when solving.
const SVD_EPS: f64 = 1e-12;

/// Number of monomial terms `x^i * y^j` with `i + j <= order`.
pub fn term_count(order: u32) -> usize {
    ((order + 1) * (order + 2) / 2) as usize
}

/// A fitted polynomial mapping from destination to source coordinates.
///
/// Resampling walks the output raster, so the fit is taken in the inverse
/// direction: destination positions are the regressors and source positions
/// the observations. Separate coefficient vectors are fitted for x and y.
#[derive(Debug, Clone)]
pub struct PolynomialMap {
    order: u32,
    x_coeffs: Vec<f64>,
    y_coeffs: Vec<f64>,
}

impl PolynomialMap {
    /// Fit a mapping of the given order to the control points.
    ///
    /// Requires at least `term_count(order)` pairs; more pairs give a
    /// least-squares fit rather than an exact interpolation.
    pub fn fit(order: u32, pairs: &[ControlPointPair]) -> Result<Self> {
        let terms = term_count(order);
        if pairs.len() < terms {
            return Err(FaltwerkError::ControlPoints(format!(
                "polynomial order {order} needs at least {terms} control points, got {}",
                pairs.len()
            )));
        }

        let mut a = DMatrix::<f64>::zeros(pairs.len(), terms);
        let mut bx = DVector::<f64>::zeros(pairs.len());
        let mut by = DVector::<f64>::zeros(pairs.len());
        for (row, pair) in pairs.iter().enumerate() {
            write_basis_row(&mut a, row, order, pair.dest.x, pair.dest.y);
            bx[row] = pair.source.x;
            by[row] = pair.source.y;
        }

        let svd = a.svd(true, true);
        let x_coeffs = svd
            .solve(&bx, SVD_EPS)
            .map_err(|e| FaltwerkError::Warp(format!("polynomial x fit failed: {e}")))?;
        let y_coeffs = svd
            .solve(&by, SVD_EPS)
            .map_err(|e| FaltwerkError::Warp(format!("polynomial y fit failed: {e}")))?;

        Ok(Self {
            order,
            x_coeffs: x_coeffs.iter().copied().collect(),
            y_coeffs: y_coeffs.iter().copied().collect(),
        })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Evaluate the mapping at a destination coordinate.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut term = 0;
        for i in 0..=self.order {
            for j in 0..=(self.order - i) {
                let basis = x.powi(i as i32) * y.powi(j as i32);
                sx += self.x_coeffs[term] * basis;
                sy += self.y_coeffs[term] * basis;
                term += 1;
            }
        }
        (sx, sy)
    }
}

/// Fill one design-matrix row with the monomial basis at `(x, y)`.
///
/// Term order is fixed: `i` (x power) outer, `j` (y power) inner, both
/// ascending. `apply` walks the same sequence.
fn write_basis_row(a: &mut DMatrix<f64>, row: usize, order: u32, x: f64, y: f64) {
    let mut term = 0;
    for i in 0..=order {
        for j in 0..=(order - i) {
            a[(row, term)] = x.powi(i as i32) * y.powi(j as i32);
            term += 1;
        }
    }
}
